// ── Node catalog ──
//
// Static layout of the REPACSS racks and the rules that route a hostname
// to its database and schema.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, IRC_METRICS, PDU_METRICS};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NodeKind {
    Compute,
    Irc,
    Pdu,
}

/// A telemetry database on the REPACSS server.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Database {
    /// GPU nodes.
    H100,
    /// CPU nodes.
    Zen4,
    /// Cooling and power distribution.
    Infra,
}

impl Database {
    pub fn schemas(self) -> &'static [&'static str] {
        match self {
            Self::H100 | Self::Zen4 => &["public", "idrac", "slurm"],
            Self::Infra => &["public", "irc", "pdu"],
        }
    }

    pub fn default_schema(self) -> &'static str {
        match self {
            Self::H100 | Self::Zen4 => "idrac",
            Self::Infra => "pdu",
        }
    }

    pub fn has_schema(self, schema: &str) -> bool {
        self.schemas().contains(&schema)
    }
}

/// Where a host's telemetry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeTarget {
    pub kind: NodeKind,
    pub database: Database,
    pub schema: &'static str,
}

pub const IRC_NODES: [&str; 6] = [
    "irc-91-5", "irc-92-5", "irc-93-3", "irc-94-5", "irc-95-3", "irc-96-5",
];

/// `(rack, compute nodes, PDUs)`.
const RACK_LAYOUT: [(u16, u16, u16); 7] = [
    (91, 20, 4),
    (92, 4, 4),
    (93, 4, 2),
    (94, 20, 4),
    (95, 20, 2),
    (96, 20, 4),
    (97, 20, 4),
];

/// Route `hostname` to its node kind, database, and schema. Unknown hosts
/// are treated as H100 compute nodes.
pub fn classify(hostname: &str) -> NodeTarget {
    if IRC_NODES.contains(&hostname) {
        NodeTarget {
            kind: NodeKind::Irc,
            database: Database::Infra,
            schema: "irc",
        }
    } else if is_pdu_node(hostname) {
        NodeTarget {
            kind: NodeKind::Pdu,
            database: Database::Infra,
            schema: "pdu",
        }
    } else if hostname.starts_with("rpc-") {
        NodeTarget {
            kind: NodeKind::Compute,
            database: Database::Zen4,
            schema: "idrac",
        }
    } else {
        NodeTarget {
            kind: NodeKind::Compute,
            database: Database::H100,
            schema: "idrac",
        }
    }
}

/// `pdu-<rack>-<n>` for a rack and index that exist.
pub fn is_pdu_node(hostname: &str) -> bool {
    let Some((rack, index)) = hostname
        .strip_prefix("pdu-")
        .and_then(|rest| rest.split_once('-'))
    else {
        return false;
    };
    let (Ok(rack), Ok(index)) = (rack.parse::<u16>(), index.parse::<u16>()) else {
        return false;
    };
    RACK_LAYOUT
        .iter()
        .any(|(number, _, pdus)| *number == rack && (1..=*pdus).contains(&index))
}

/// Power metrics worth querying for a node kind.
pub fn default_metrics(kind: NodeKind) -> Vec<&'static str> {
    match kind {
        NodeKind::Irc => IRC_METRICS.to_vec(),
        NodeKind::Pdu => PDU_METRICS.to_vec(),
        NodeKind::Compute => catalog::compute_metrics(),
    }
}

// ── Racks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rack {
    pub number: u16,
    pub compute_nodes: Vec<String>,
    pub pdu_nodes: Vec<String>,
    pub irc_node: Option<&'static str>,
}

pub fn rack(number: u16) -> Option<Rack> {
    let (_, compute, pdus) = RACK_LAYOUT.iter().find(|(n, _, _)| *n == number)?;
    let prefix = format!("-{number}-");
    Some(Rack {
        number,
        compute_nodes: (1..=*compute).map(|i| format!("rpc-{number}-{i}")).collect(),
        pdu_nodes: (1..=*pdus).map(|i| format!("pdu-{number}-{i}")).collect(),
        irc_node: IRC_NODES.iter().copied().find(|n| n.contains(&prefix)),
    })
}

pub fn racks() -> Vec<Rack> {
    RACK_LAYOUT.iter().filter_map(|(n, _, _)| rack(*n)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hostnames_route_to_databases() {
        let irc = classify("irc-93-3");
        assert_eq!((irc.kind, irc.database, irc.schema), (NodeKind::Irc, Database::Infra, "irc"));

        let pdu = classify("pdu-95-2");
        assert_eq!((pdu.kind, pdu.database, pdu.schema), (NodeKind::Pdu, Database::Infra, "pdu"));

        let gpu = classify("rpg-93-1");
        assert_eq!((gpu.database, gpu.schema), (Database::H100, "idrac"));

        let cpu = classify("rpc-91-7");
        assert_eq!((cpu.kind, cpu.database), (NodeKind::Compute, Database::Zen4));

        let unknown = classify("login-1");
        assert_eq!((unknown.kind, unknown.database), (NodeKind::Compute, Database::H100));
    }

    #[test]
    fn pdu_outside_layout_is_not_a_pdu() {
        assert!(is_pdu_node("pdu-93-2"));
        assert!(!is_pdu_node("pdu-93-3"));
        assert!(!is_pdu_node("pdu-98-1"));
        assert!(!is_pdu_node("pdu-x"));
        assert_eq!(classify("pdu-93-3").database, Database::H100);
    }

    #[test]
    fn rack_membership() {
        let r92 = rack(92).unwrap();
        assert_eq!(r92.compute_nodes, vec!["rpc-92-1", "rpc-92-2", "rpc-92-3", "rpc-92-4"]);
        assert_eq!(r92.pdu_nodes.len(), 4);
        assert_eq!(r92.irc_node, Some("irc-92-5"));

        let r91 = rack(91).unwrap();
        assert_eq!(r91.compute_nodes.len(), 20);
        assert_eq!(r91.compute_nodes.last().unwrap(), "rpc-91-20");

        assert_eq!(rack(97).unwrap().irc_node, None);
        assert!(rack(90).is_none());
        assert_eq!(racks().len(), 7);
    }

    #[test]
    fn schemas_per_database() {
        assert!(Database::Zen4.has_schema("slurm"));
        assert!(!Database::Infra.has_schema("idrac"));
        assert_eq!(Database::Infra.default_schema(), "pdu");
        assert_eq!("H100".parse::<Database>().unwrap(), Database::H100);
    }

    #[test]
    fn metrics_per_kind() {
        assert_eq!(default_metrics(NodeKind::Pdu), vec!["pdu"]);
        assert_eq!(default_metrics(NodeKind::Irc).len(), 6);
        assert!(default_metrics(NodeKind::Compute).contains(&"SystemOutputPower"));
    }
}
