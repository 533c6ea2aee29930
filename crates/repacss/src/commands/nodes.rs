//! Node catalog command handlers.

use serde::Serialize;
use tabled::Tabled;

use repacss_core::nodes::{self, default_metrics};
use repacss_core::{Database, NodeKind, NodeTarget, Rack};

use crate::cli::{NodeKindArg, NodesArgs, NodesCommand};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

// ── Classify ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Routed {
    hostname: String,
    #[serde(flatten)]
    target: NodeTarget,
}

#[derive(Tabled)]
struct RoutedRow {
    #[tabled(rename = "Host")]
    hostname: String,
    #[tabled(rename = "Kind")]
    kind: NodeKind,
    #[tabled(rename = "Database")]
    database: Database,
    #[tabled(rename = "Schema")]
    schema: &'static str,
}

impl From<&Routed> for RoutedRow {
    fn from(r: &Routed) -> Self {
        Self {
            hostname: r.hostname.clone(),
            kind: r.target.kind,
            database: r.target.database,
            schema: r.target.schema,
        }
    }
}

// ── Racks ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct RackRow {
    #[tabled(rename = "Rack")]
    number: u16,
    #[tabled(rename = "Compute")]
    compute: String,
    #[tabled(rename = "PDUs")]
    pdus: String,
    #[tabled(rename = "IRC")]
    irc: String,
}

/// `rpc-91-1 .. rpc-91-20`, or the lone member.
fn span(members: &[String]) -> String {
    match members {
        [] => "-".into(),
        [only] => only.clone(),
        [first, .., last] => format!("{first} .. {last} ({})", members.len()),
    }
}

impl From<&Rack> for RackRow {
    fn from(r: &Rack) -> Self {
        Self {
            number: r.number,
            compute: span(&r.compute_nodes),
            pdus: span(&r.pdu_nodes),
            irc: r.irc_node.unwrap_or("-").to_owned(),
        }
    }
}

fn rack_detail(r: &Rack) -> String {
    let mut lines = vec![
        format!("Rack {}", r.number),
        format!("IRC:      {}", r.irc_node.unwrap_or("-")),
        format!("PDUs:     {}", r.pdu_nodes.join(", ")),
        "Compute:".to_owned(),
    ];
    lines.extend(r.compute_nodes.iter().map(|n| format!("  {n}")));
    lines.join("\n")
}

// ── Metrics ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
}

fn node_kind(arg: NodeKindArg) -> NodeKind {
    match arg {
        NodeKindArg::Compute => NodeKind::Compute,
        NodeKindArg::Irc => NodeKind::Irc,
        NodeKindArg::Pdu => NodeKind::Pdu,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::needless_pass_by_value)]
pub fn handle(args: NodesArgs, settings: &Settings) -> Result<(), CliError> {
    let out = match args.command {
        NodesCommand::Classify { hosts } => {
            let routed: Vec<Routed> = hosts
                .into_iter()
                .map(|hostname| Routed {
                    target: nodes::classify(&hostname),
                    hostname,
                })
                .collect();
            output::render_list(settings.output, &routed, |r| RoutedRow::from(r), |r| {
                format!("{}\t{}.{}", r.hostname, r.target.database, r.target.schema)
            })?
        }
        NodesCommand::Rack { number } => {
            let rack = nodes::rack(number).ok_or_else(|| CliError::NotFound {
                path: format!("rack {number}"),
            })?;
            output::render_single(settings.output, &rack, rack_detail, |r| {
                r.compute_nodes
                    .iter()
                    .chain(&r.pdu_nodes)
                    .cloned()
                    .chain(r.irc_node.map(str::to_owned))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?
        }
        NodesCommand::Racks => {
            let racks = nodes::racks();
            output::render_list(settings.output, &racks, |r| RackRow::from(r), |r| {
                r.number.to_string()
            })?
        }
        NodesCommand::Metrics { kind } => {
            let metrics = default_metrics(node_kind(kind));
            output::render_list(
                settings.output,
                &metrics,
                |m| MetricRow { metric: *m },
                |m| (*m).to_owned(),
            )?
        }
    };
    output::print_output(&out, settings.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn member_span_collapses_long_lists() {
        let rack = nodes::rack(93).unwrap();
        assert_eq!(span(&rack.pdu_nodes), "pdu-93-1 .. pdu-93-2 (2)");
        assert_eq!(span(&["irc-93-3".to_owned()]), "irc-93-3");
        assert_eq!(span(&[]), "-");
    }

    #[test]
    fn detail_lists_every_compute_node() {
        let rack = nodes::rack(92).unwrap();
        let text = rack_detail(&rack);
        assert!(text.contains("  rpc-92-4"));
        assert!(text.contains("IRC:      irc-92-5"));
    }
}
