use log::debug;

use super::{CollectContext, Collector};
use crate::error::ExecError;

/// Command whose output carries per-interface admin/link state and the
/// free-text description column.
pub const SHOW_DESCRIPTIONS: &str = "show interfaces descriptions";

/// One row of the interface description table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescription {
    pub name: String,
    pub admin_up: bool,
    pub link_up: bool,
    pub description: String,
}

/// Parses `show interfaces descriptions` style tabular output.
///
/// Expected row shape: `<interface> <admin> <link> <description...>`. The
/// header row and anything narrower than three columns is skipped, since
/// devices pad the table with blank and continuation lines.
pub fn parse_description_table(text: &str) -> Vec<InterfaceDescription> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with("Interface") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(admin), Some(link)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let description = fields.collect::<Vec<_>>().join(" ");
        rows.push(InterfaceDescription {
            name: name.to_string(),
            admin_up: admin.eq_ignore_ascii_case("up"),
            link_up: link.eq_ignore_ascii_case("up"),
            description,
        });
    }
    rows
}

/// Feeds the dynamic label schema from interface description text.
///
/// This is the single writer of the label registry: it runs before any
/// collector that reads per-interface label vectors, so fresh tags appear in
/// the schema by the time values are emitted.
#[derive(Debug, Default)]
pub struct DescriptionCollector;

impl DescriptionCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Collector for DescriptionCollector {
    fn name(&self) -> &'static str {
        "descriptions"
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<(), ExecError> {
        let raw = ctx.session.run(SHOW_DESCRIPTIONS).await?;
        let text = std::str::from_utf8(&raw)?;

        let pairs: Vec<(String, String)> = parse_description_table(text)
            .into_iter()
            .map(|row| (row.name, row.description))
            .collect();
        debug!(
            "{}: observed {} interface descriptions",
            ctx.session.device(),
            pairs.len()
        );
        ctx.labels
            .observe_descriptions(ctx.session.device().addr(), &pairs);
        Ok(())
    }
}
