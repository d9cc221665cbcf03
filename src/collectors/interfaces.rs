use log::debug;
use prometheus::{IntGaugeVec, Opts, Registry};

use super::descriptions::{SHOW_DESCRIPTIONS, parse_description_table};
use super::{CollectContext, Collector};
use crate::error::ExecError;
use crate::labels::LabelRegistry;

/// Labels every interface series carries ahead of the dynamic schema.
const BASE_LABELS: [&str; 2] = ["device", "interface"];

/// Per-interface status gauges.
///
/// The dynamic label arity is frozen at registration from the schema known
/// at that moment; every subsequent sample truncates its value vector to
/// that arity. Slots never renumber, so the truncated prefix always lines
/// up with the registered names.
#[derive(Clone)]
pub struct InterfaceMetrics {
    up: IntGaugeVec,
    admin_up: IntGaugeVec,
    schema_len: usize,
}

impl InterfaceMetrics {
    /// Creates and registers the interface gauges.
    ///
    /// Call after the label schema has been primed (one descriptions pass
    /// across the fleet); names discovered later are dropped from these
    /// series rather than changing their arity.
    pub fn register(registry: &Registry, labels: &LabelRegistry) -> prometheus::Result<Self> {
        let schema = labels.label_names();
        let mut up_labels: Vec<&str> = BASE_LABELS.to_vec();
        up_labels.extend(schema.iter().map(String::as_str));

        let up = IntGaugeVec::new(
            Opts::new(
                "netgauge_interface_up",
                "Link state of the interface (1 = up), labeled with description tags",
            ),
            &up_labels,
        )?;
        let admin_up = IntGaugeVec::new(
            Opts::new(
                "netgauge_interface_admin_up",
                "Administrative state of the interface (1 = enabled)",
            ),
            &BASE_LABELS,
        )?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(admin_up.clone()))?;

        Ok(Self {
            up,
            admin_up,
            schema_len: schema.len(),
        })
    }

    /// Applies one device's parsed description table to the gauges.
    pub fn update(
        &self,
        device: &str,
        labels: &LabelRegistry,
        rows: &[super::InterfaceDescription],
    ) {
        for row in rows {
            let dynamic = labels.values_for(device, &row.name);
            let mut values: Vec<&str> = vec![device, row.name.as_str()];
            values.extend(
                dynamic
                    .iter()
                    .take(self.schema_len)
                    .map(String::as_str),
            );
            // A schema shorter than the registered arity can only come from
            // a fresh registry; pad rather than emit a short vector.
            values.resize(BASE_LABELS.len() + self.schema_len, "");

            self.up
                .with_label_values(&values)
                .set(i64::from(row.link_up));
            self.admin_up
                .with_label_values(&[device, row.name.as_str()])
                .set(i64::from(row.admin_up));
        }
    }
}

/// Emits per-interface status gauges with the dynamic label schema.
pub struct InterfaceCollector {
    metrics: InterfaceMetrics,
}

impl InterfaceCollector {
    pub fn new(metrics: InterfaceMetrics) -> Self {
        Self { metrics }
    }
}

impl Collector for InterfaceCollector {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<(), ExecError> {
        let raw = ctx.session.run(SHOW_DESCRIPTIONS).await?;
        let text = std::str::from_utf8(&raw)?;
        let rows = parse_description_table(text);
        debug!("{}: {} interface rows", ctx.session.device(), rows.len());
        self.metrics
            .update(ctx.session.device().addr(), ctx.labels, &rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{InterfaceMetrics, parse_description_table};
    use crate::labels::LabelRegistry;
    use prometheus::Registry;

    const TABLE: &str = "\
Interface       Admin Link Description
ge-0/0/0        up    up   CORE-LINK [core] [site=fra1]
ge-0/0/1        up    down Customer foo [customer=foo]
";

    fn primed_registry() -> LabelRegistry {
        let labels = LabelRegistry::new();
        let pairs: Vec<(String, String)> = parse_description_table(TABLE)
            .into_iter()
            .map(|row| (row.name, row.description))
            .collect();
        labels.observe_descriptions("r1:22", &pairs);
        labels
    }

    #[test]
    fn registration_freezes_dynamic_arity() {
        let labels = primed_registry();
        let registry = Registry::new();
        let metrics = InterfaceMetrics::register(&registry, &labels).expect("register");
        assert_eq!(metrics.schema_len, 3);
    }

    #[test]
    fn samples_carry_backfilled_schema_values() {
        let labels = primed_registry();
        let registry = Registry::new();
        let metrics = InterfaceMetrics::register(&registry, &labels).expect("register");

        metrics.update("r1:22", &labels, &parse_description_table(TABLE));

        let families = registry.gather();
        let up = families
            .iter()
            .find(|family| family.get_name() == "netgauge_interface_up")
            .expect("up family present");
        assert_eq!(up.get_metric().len(), 2);

        for metric in up.get_metric() {
            // device + interface + 3 schema slots, on every sample.
            assert_eq!(metric.get_label().len(), 5);
        }

        let core_link = up
            .get_metric()
            .iter()
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "interface" && label.get_value() == "ge-0/0/0")
            })
            .expect("ge-0/0/0 sample present");
        assert_eq!(core_link.get_gauge().get_value() as i64, 1);
        let site = core_link
            .get_label()
            .iter()
            .find(|label| label.get_name() == "site")
            .expect("site label present");
        assert_eq!(site.get_value(), "fra1");
        let customer = core_link
            .get_label()
            .iter()
            .find(|label| label.get_name() == "customer")
            .expect("customer label present");
        assert_eq!(customer.get_value(), "");
    }

    #[test]
    fn schema_growth_after_registration_does_not_change_arity() {
        let labels = primed_registry();
        let registry = Registry::new();
        let metrics = InterfaceMetrics::register(&registry, &labels).expect("register");

        // A tag discovered after registration lands in the schema but not in
        // these series.
        labels.observe_descriptions(
            "r2:22",
            &[("ae0".to_string(), "[late_tag=x] [core]".to_string())],
        );
        metrics.update(
            "r2:22",
            &labels,
            &parse_description_table("ae0 up up [late_tag=x] [core]\n"),
        );

        let families = registry.gather();
        let up = families
            .iter()
            .find(|family| family.get_name() == "netgauge_interface_up")
            .expect("up family present");
        for metric in up.get_metric() {
            assert_eq!(metric.get_label().len(), 5);
        }
    }
}
