//! Prometheus text exposition format (version 0.0.4).
//!
//! Pure serialization over [`MetricSnapshot`]s; never fails. Each metric gets
//! a `# TYPE` line followed by one value line per sub-key of its snapshot.
//! Multi-sub-key snapshots (histogram buckets, meter windows) render the
//! sub-key as a trailing synthetic label: `le` for bucket bounds, `window`
//! for meter rates and the lifetime mean.

use std::fmt::Write;

use crate::metrics::MetricValue;
use crate::registry::MetricSnapshot;

/// Content type identifying the exposition format and version.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a sample using Go's tokens for the infinities.
fn number(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escape backslashes, quotes, and control characters so every metric line
/// stays single-line text. Applied to names and tag keys as well as label
/// values; a registered name is caller-controlled, not trusted.
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c if c.is_control() => {
                let _ = write!(out, "{}", c.escape_default());
            }
            c => out.push(c),
        }
    }
    out
}

fn write_line(
    out: &mut String,
    name: &str,
    tags: &[(&'static str, &'static str)],
    sub_key: Option<(&str, &str)>,
    value: &str,
) {
    out.push_str(name);
    if !tags.is_empty() || sub_key.is_some() {
        out.push('{');
        let mut first = true;
        for (key, tag_value) in tags {
            if !first {
                out.push(',');
            }
            first = false;
            let _ = write!(out, "{}=\"{}\"", escape_label(key), escape_label(tag_value));
        }
        if let Some((key, sub_value)) = sub_key {
            if !first {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", key, escape_label(sub_value));
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

/// Serialize a snapshot sequence into the text wire format. The output ends
/// with a trailing newline.
pub fn serialize(snapshots: &[MetricSnapshot]) -> String {
    let mut out = String::new();
    for snapshot in snapshots {
        debug_assert!(snapshot.tags.is_sorted());
        let name = escape_label(snapshot.name);
        let name = name.as_str();
        let _ = writeln!(out, "# TYPE {} {}", name, snapshot.kind.exposition_type());
        let tags = snapshot.tags.as_slice();
        match &snapshot.value {
            MetricValue::Counter(v) => write_line(&mut out, name, tags, None, &v.to_string()),
            MetricValue::MonotonicCounter(v) | MetricValue::Exceptions(v) => {
                write_line(&mut out, name, tags, None, &v.to_string())
            }
            MetricValue::Gauge(v) => write_line(&mut out, name, tags, None, &number(*v)),
            MetricValue::Histogram(buckets) => {
                for (bound, count) in buckets {
                    let le = number(*bound);
                    write_line(
                        &mut out,
                        name,
                        tags,
                        Some(("le", le.as_str())),
                        &count.to_string(),
                    );
                }
            }
            MetricValue::Meter { windows, mean } => {
                for (seconds, rate) in windows {
                    let window = number(*seconds);
                    write_line(
                        &mut out,
                        name,
                        tags,
                        Some(("window", window.as_str())),
                        &number(rate.unwrap_or(0.0)),
                    );
                }
                write_line(&mut out, name, tags, Some(("window", "mean")), &number(*mean));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;

    fn snap(
        name: &'static str,
        kind: MetricKind,
        tags: &[(&'static str, &'static str)],
        value: MetricValue,
    ) -> MetricSnapshot {
        MetricSnapshot {
            name,
            kind,
            tags: tags.iter().copied().collect(),
            value,
        }
    }

    #[test]
    fn single_value_metrics_render_one_line_each() {
        let snapshots = vec![
            snap(
                "requests",
                MetricKind::MonotonicCounter,
                &[],
                MetricValue::MonotonicCounter(5),
            ),
            snap("latency", MetricKind::Gauge, &[], MetricValue::Gauge(0.5)),
        ];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE requests counter\n\
             requests 5\n\
             # TYPE latency gauge\n\
             latency 0.5\n"
        );
    }

    #[test]
    fn tags_render_sorted_and_quoted() {
        let snapshots = vec![snap(
            "requests",
            MetricKind::MonotonicCounter,
            &[("method", "GET"), ("status", "200")],
            MetricValue::MonotonicCounter(3),
        )];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE requests counter\n\
             requests{method=\"GET\",status=\"200\"} 3\n"
        );
    }

    #[test]
    fn histogram_buckets_get_le_labels() {
        let snapshots = vec![snap(
            "sizes",
            MetricKind::Histogram,
            &[("queue", "jobs")],
            MetricValue::Histogram(vec![(1.0, 0), (5.0, 1), (f64::INFINITY, 2)]),
        )];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE sizes histogram\n\
             sizes{queue=\"jobs\",le=\"1\"} 0\n\
             sizes{queue=\"jobs\",le=\"5\"} 1\n\
             sizes{queue=\"jobs\",le=\"+Inf\"} 2\n"
        );
    }

    #[test]
    fn meter_windows_get_window_labels() {
        let snapshots = vec![snap(
            "rate",
            MetricKind::Meter,
            &[],
            MetricValue::Meter {
                windows: vec![(60.0, Some(2.5)), (300.0, None)],
                mean: 1.25,
            },
        )];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE rate summary\n\
             rate{window=\"60\"} 2.5\n\
             rate{window=\"300\"} 0\n\
             rate{window=\"mean\"} 1.25\n"
        );
    }

    #[test]
    fn infinities_use_go_tokens() {
        let snapshots = vec![
            snap(
                "hot",
                MetricKind::Gauge,
                &[],
                MetricValue::Gauge(f64::INFINITY),
            ),
            snap(
                "cold",
                MetricKind::Gauge,
                &[],
                MetricValue::Gauge(f64::NEG_INFINITY),
            ),
        ];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE hot gauge\nhot +Inf\n# TYPE cold gauge\ncold -Inf\n"
        );
    }

    #[test]
    fn label_values_are_escaped() {
        let snapshots = vec![snap(
            "requests",
            MetricKind::MonotonicCounter,
            &[("path", "a\\b\"c\nd")],
            MetricValue::MonotonicCounter(1),
        )];
        assert_eq!(
            serialize(&snapshots),
            "# TYPE requests counter\n\
             requests{path=\"a\\\\b\\\"c\\nd\"} 1\n"
        );
    }

    #[test]
    fn names_and_tag_keys_with_control_chars_stay_single_line() {
        let snapshots = vec![snap(
            "bad\nname",
            MetricKind::Gauge,
            &[("k\ney", "v")],
            MetricValue::Gauge(1.0),
        )];
        let text = serialize(&snapshots);
        assert_eq!(
            text,
            "# TYPE bad\\nname gauge\n\
             bad\\nname{k\\ney=\"v\"} 1\n"
        );
        // every value line is one line: newlines only terminate lines
        assert!(text.lines().all(|line| !line.is_empty()));
    }

    #[test]
    fn empty_input_serializes_to_empty_output() {
        assert_eq!(serialize(&[]), "");
    }
}
