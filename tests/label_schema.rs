//! End-to-end behavior of the dynamic label schema: descriptions parsed
//! from device output feed one process-wide slot table, and every metric
//! series keeps the same label arity no matter which device a sample came
//! from.

use netgauge::collectors::{InterfaceMetrics, parse_description_table};
use netgauge::labels::LabelRegistry;
use prometheus::Registry;

const DEVICE_A: &str = "edge-a.example.net:22";
const DEVICE_B: &str = "edge-b.example.net:22";

const TABLE_A: &str = "\
Interface       Admin Link Description
ge-0/0/0        up    up   Uplink [tag1] [foo=a]
";

const TABLE_B: &str = "\
Interface       Admin Link Description
xe-0/0/0        up    down Peering [foo=b] [bar=x]
";

fn observe(labels: &LabelRegistry, device: &str, table: &str) {
    let pairs: Vec<(String, String)> = parse_description_table(table)
        .into_iter()
        .map(|row| (row.name, row.description))
        .collect();
    labels.observe_descriptions(device, &pairs);
}

#[test]
fn schema_is_shared_across_devices_and_grows_append_only() {
    let labels = LabelRegistry::new();

    observe(&labels, DEVICE_A, TABLE_A);
    let first_snapshot = labels.label_names();
    assert_eq!(first_snapshot, vec!["tag1", "foo"]);

    observe(&labels, DEVICE_B, TABLE_B);
    let second_snapshot = labels.label_names();
    assert_eq!(second_snapshot, vec!["tag1", "foo", "bar"]);
    assert_eq!(&second_snapshot[..first_snapshot.len()], &first_snapshot[..]);

    assert_eq!(labels.values_for(DEVICE_A, "ge-0/0/0"), vec!["1", "a", ""]);
    assert_eq!(labels.values_for(DEVICE_B, "xe-0/0/0"), vec!["", "b", "x"]);
}

#[test]
fn unknown_interface_reads_as_all_empty_values() {
    let labels = LabelRegistry::new();
    observe(&labels, DEVICE_A, TABLE_A);
    observe(&labels, DEVICE_B, TABLE_B);

    let values = labels.values_for(DEVICE_A, "ae13");
    assert_eq!(values.len(), labels.label_names().len());
    assert!(values.iter().all(String::is_empty));
}

#[test]
fn metric_series_keep_one_arity_fleet_wide() {
    let labels = LabelRegistry::new();
    observe(&labels, DEVICE_A, TABLE_A);
    observe(&labels, DEVICE_B, TABLE_B);

    let registry = Registry::new();
    let metrics = InterfaceMetrics::register(&registry, &labels).expect("metrics register");
    metrics.update(DEVICE_A, &labels, &parse_description_table(TABLE_A));
    metrics.update(DEVICE_B, &labels, &parse_description_table(TABLE_B));

    let families = registry.gather();
    let up = families
        .iter()
        .find(|family| family.get_name() == "netgauge_interface_up")
        .expect("interface up family");
    assert_eq!(up.get_metric().len(), 2);

    for metric in up.get_metric() {
        // device + interface + the 3 schema slots, on every sample.
        assert_eq!(metric.get_label().len(), 5);
    }

    let device_b_sample = up
        .get_metric()
        .iter()
        .find(|metric| {
            metric
                .get_label()
                .iter()
                .any(|label| label.get_name() == "device" && label.get_value() == DEVICE_B)
        })
        .expect("device B sample");
    // Link is down on xe-0/0/0.
    assert_eq!(device_b_sample.get_gauge().get_value() as i64, 0);

    let tag1 = device_b_sample
        .get_label()
        .iter()
        .find(|label| label.get_name() == "tag1")
        .expect("tag1 label backfilled");
    assert_eq!(tag1.get_value(), "");
}
