//! Selection and statsd encoding of Riak stats.
//!
//! The whitelist is a hash map, so the order of the encoded lines is not
//! defined and may differ between runs. Collectors treat each line
//! independently.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::upstream::StatusDocument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    Gauge,
    Timing,
}

impl MetricType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Gauge => "g",
            Self::Timing => "ms",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

use MetricType::{Gauge, Timing};

const RIAK_METRICS: &[(&str, MetricType)] = &[
    ("node_gets", Gauge),
    ("node_puts", Gauge),
    ("vnode_gets", Gauge),
    ("vnode_puts", Gauge),
    ("read_repairs", Gauge),
    ("read_repairs_total", Gauge),
    ("node_get_fsm_objsize_mean", Gauge),
    ("node_get_fsm_objsize_median", Gauge),
    ("node_get_fsm_objsize_95", Gauge),
    ("node_get_fsm_objsize_100", Gauge),
    ("node_get_fsm_time_mean", Timing),
    ("node_get_fsm_time_median", Timing),
    ("node_get_fsm_time_95", Timing),
    ("node_get_fsm_time_100", Timing),
    ("node_put_fsm_time_mean", Timing),
    ("node_put_fsm_time_median", Timing),
    ("node_put_fsm_time_95", Timing),
    ("node_put_fsm_time_100", Timing),
    ("node_get_fsm_siblings_mean", Gauge),
    ("node_get_fsm_siblings_median", Gauge),
    ("node_get_fsm_siblings_95", Gauge),
    ("node_get_fsm_siblings_100", Gauge),
    ("memory_processes_used", Gauge),
    ("node_get_fsm_active", Gauge),
    ("node_get_fsm_active_60s", Gauge),
    ("node_get_fsm_in_rate", Gauge),
    ("node_get_fsm_out_rate", Gauge),
    ("node_get_fsm_rejected", Gauge),
    ("node_get_fsm_rejected_60s", Gauge),
    ("node_get_fsm_rejected_total", Gauge),
    ("node_put_fsm_active", Gauge),
    ("node_put_fsm_active_60s", Gauge),
    ("node_put_fsm_in_rate", Gauge),
    ("node_put_fsm_out_rate", Gauge),
    ("node_put_fsm_rejected", Gauge),
    ("node_put_fsm_rejected_60s", Gauge),
    ("node_put_fsm_rejected_total", Gauge),
    ("index_fsm_create", Gauge),
    ("index_fsm_create_error", Gauge),
    ("index_fsm_active", Gauge),
    ("list_fsm_create", Gauge),
    ("list_fsm_create_error", Gauge),
    ("list_fsm_active", Gauge),
    ("sys_process_count", Gauge),
    ("coord_redirs_total", Gauge),
    ("pbc_connects", Gauge),
    ("pbc_active", Gauge),
];

/// Stat names relayed each cycle and their statsd types.
#[derive(Clone, Debug, PartialEq)]
pub struct Whitelist(HashMap<&'static str, MetricType>);

impl Whitelist {
    pub fn riak() -> Self {
        RIAK_METRICS.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<MetricType> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricType)> + '_ {
        self.0.iter().map(|(name, kind)| (*name, *kind))
    }
}

impl FromIterator<(&'static str, MetricType)> for Whitelist {
    fn from_iter<I: IntoIterator<Item = (&'static str, MetricType)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders a stat value for the wire. Strings go out without quotes, and a
/// missing stat or a JSON `null` renders as the empty string.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

/// Turns a status document into statsd lines, one per whitelisted stat.
#[derive(Clone, Debug)]
pub struct Encoder {
    whitelist: Arc<Whitelist>,
}

impl Encoder {
    pub fn new(whitelist: Arc<Whitelist>) -> Self {
        Self { whitelist }
    }

    /// Lines are `<node>.<name>:<value>|<tag>`. Every whitelisted stat is
    /// emitted whether or not the document has it.
    pub fn encode(&self, node: &str, doc: &StatusDocument) -> Vec<String> {
        self.whitelist
            .iter()
            .map(|(name, kind)| {
                format!("{node}.{name}:{}|{kind}", render_value(doc.get(name)))
            })
            .collect()
    }

    /// The datagram body: encoded lines joined by newlines.
    pub fn encode_payload(&self, node: &str, doc: &StatusDocument) -> String {
        self.encode(node, doc).join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Map};
    use std::collections::HashSet;

    fn doc(value: Value) -> StatusDocument {
        match value {
            Value::Object(map) => StatusDocument::from(map),
            _ => panic!("not an object"),
        }
    }

    fn full_doc() -> StatusDocument {
        let map: Map<String, Value> = RIAK_METRICS
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), Value::from(i as u64 * 10)))
            .collect();
        StatusDocument::from(map)
    }

    fn riak_encoder() -> Encoder {
        Encoder::new(Arc::new(Whitelist::riak()))
    }

    // ^\S+\.\S+:.+\|(g|ms)$
    fn is_well_formed(line: &str) -> bool {
        let Some((head, tag)) = line.rsplit_once('|') else {
            return false;
        };
        let Some((key, value)) = head.split_once(':') else {
            return false;
        };
        let Some((node, name)) = key.split_once('.') else {
            return false;
        };

        (tag == "g" || tag == "ms")
            && !value.is_empty()
            && !node.is_empty()
            && !name.is_empty()
            && !key.contains(char::is_whitespace)
    }

    #[test]
    fn it_has_the_riak_table() {
        let whitelist = Whitelist::riak();

        assert_eq!(whitelist.len(), 47);
        assert_eq!(whitelist.iter().filter(|(_, t)| *t == Timing).count(), 8);
        assert_eq!(whitelist.get("node_get_fsm_time_95"), Some(Timing));
        assert_eq!(whitelist.get("node_put_fsm_time_mean"), Some(Timing));
        assert_eq!(whitelist.get("node_get_fsm_objsize_95"), Some(Gauge));
        assert_eq!(whitelist.get("pbc_active"), Some(Gauge));
        assert_eq!(whitelist.get("nodename"), None);
    }

    #[test]
    fn it_tags_types() {
        assert_eq!(Gauge.to_string(), "g");
        assert_eq!(Timing.to_string(), "ms");
    }

    #[test]
    fn it_encodes_every_whitelisted_stat() {
        let encoder = riak_encoder();
        let lines = encoder.encode("riak", &full_doc());

        assert_eq!(lines.len(), 47);
        for line in &lines {
            assert!(is_well_formed(line), "malformed line {line:?}");
        }
        assert!(lines.contains(&"riak.node_gets:0|g".to_string()));
        assert!(lines.contains(&"riak.node_get_fsm_time_mean:100|ms".to_string()));
    }

    #[test]
    fn it_keeps_missing_stats() {
        let encoder = riak_encoder();
        let lines = encoder.encode("riak1", &doc(json!({"node_gets": 42})));

        assert_eq!(lines.len(), 47);
        assert!(lines.contains(&"riak1.node_gets:42|g".to_string()));
        assert!(lines.contains(&"riak1.pbc_active:|g".to_string()));
        assert!(lines.contains(&"riak1.node_put_fsm_time_100:|ms".to_string()));
    }

    #[test]
    fn it_encodes_empty_document() {
        let encoder = riak_encoder();
        let lines = encoder.encode("riak", &StatusDocument::default());

        assert_eq!(lines.len(), 47);
        assert!(lines.iter().all(|l| l.contains(":|")));
    }

    #[test]
    fn it_ignores_unlisted_stats() {
        let encoder = riak_encoder();
        let lines = encoder.encode("riak", &doc(json!({"ring_members": ["a", "b"]})));

        assert!(lines.iter().all(|l| !l.contains("ring_members")));
    }

    #[test]
    fn it_renders_values() {
        assert_eq!(render_value(None), "");
        assert_eq!(render_value(Some(&Value::Null)), "");
        assert_eq!(render_value(Some(&json!(42))), "42");
        assert_eq!(render_value(Some(&json!(-7))), "-7");
        assert_eq!(render_value(Some(&json!(1.5))), "1.5");
        assert_eq!(render_value(Some(&json!(0))), "0");
        assert_eq!(render_value(Some(&json!("riak@127.0.0.1"))), "riak@127.0.0.1");
        assert_eq!(render_value(Some(&json!(true))), "true");
        assert_eq!(render_value(Some(&json!([1, 2]))), "[1,2]");
    }

    #[test]
    fn it_passes_values_through() {
        let encoder = Encoder::new(Arc::new(Whitelist::from_iter([
            ("a", Gauge),
            ("b", Timing),
            ("c", Gauge),
        ])));
        let lines: HashSet<_> = encoder
            .encode("n", &doc(json!({"a": 3.25, "b": "fast", "c": null})))
            .into_iter()
            .collect();

        assert_eq!(
            lines,
            HashSet::from([
                "n.a:3.25|g".to_string(),
                "n.b:fast|ms".to_string(),
                "n.c:|g".to_string(),
            ])
        );
    }

    #[test]
    fn it_is_deterministic_up_to_order() {
        let encoder = riak_encoder();
        let doc = full_doc();

        let a: HashSet<_> = encoder.encode("riak", &doc).into_iter().collect();
        let b: HashSet<_> = riak_encoder().encode("riak", &doc).into_iter().collect();

        assert_eq!(a, b);
        assert_eq!(a.len(), 47);
    }

    #[test]
    fn it_joins_payload_lines() {
        let encoder = Encoder::new(Arc::new(Whitelist::from_iter([("a", Gauge)])));
        assert_eq!(encoder.encode_payload("n", &doc(json!({"a": 1}))), "n.a:1|g");

        let payload = riak_encoder().encode_payload("riak", &full_doc());
        assert_eq!(payload.lines().count(), 47);
        assert!(!payload.ends_with('\n'));
    }
}
