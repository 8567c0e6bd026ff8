//! Text printed around the pod table

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use podstatus_k8s::Resolution;
use podstatus_status::age_since;
use podstatus_types::{EventRecord, NONE_SENTINEL};
use podstatus_view::format_table;

const EVENT_HEADER: [&str; 5] = ["TYPE", "REASON", "AGE", "FROM", "MESSAGE"];

/// Describe what the table is showing, followed by a blank line
pub fn print_banner(out: &mut impl Write, resolution: &Resolution) -> io::Result<()> {
    writeln!(out, "{}", resolution.target)?;
    if let Some(via) = &resolution.via {
        writeln!(out, "Via: {} {}", via.kind, via.name)?;
    }
    writeln!(out, "Selector: -l{}", resolution.selector)?;
    writeln!(out)?;
    out.flush()
}

/// Print the events of a pod below its status row
pub fn print_events(
    out: &mut impl Write,
    events: &[EventRecord],
    headers: bool,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out)?;
    if events.is_empty() {
        writeln!(out, "Events: {}", NONE_SENTINEL)?;
        return out.flush();
    }

    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|event| {
            vec![
                event.event_type.clone(),
                event.reason.clone(),
                event
                    .last_seen
                    .map(|seen| age_since(seen, now))
                    .unwrap_or_else(|| NONE_SENTINEL.to_string()),
                event.source.clone(),
                // Keep each event on one line
                event.message.trim().replace('\n', " "),
            ]
        })
        .collect();

    let header = headers.then_some(&EVENT_HEADER[..]);
    for line in format_table(header, &rows) {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use podstatus_types::{TargetKind, TargetReference};

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_banner_for_workload() {
        let resolution = Resolution {
            target: TargetReference::new(TargetKind::Deployment, "shop", "web"),
            via: None,
            selector: "app=web".to_string(),
        };

        let text = render(|out| print_banner(out, &resolution));
        assert_eq!(text, "Deployment: shop/web\nSelector: -lapp=web\n\n");
    }

    #[test]
    fn test_banner_through_autoscaler() {
        let resolution = Resolution {
            target: TargetReference::new(TargetKind::StatefulSet, "shop", "db"),
            via: Some(TargetReference::new(
                TargetKind::HorizontalPodAutoscaler,
                "shop",
                "db-hpa",
            )),
            selector: "app=db".to_string(),
        };

        let text = render(|out| print_banner(out, &resolution));
        assert_eq!(
            text,
            "StatefulSet: shop/db\nVia: HorizontalPodAutoscaler db-hpa\nSelector: -lapp=db\n\n"
        );
    }

    #[test]
    fn test_events_table() {
        let now = Utc::now();
        let events = vec![EventRecord {
            event_type: "Warning".to_string(),
            reason: "BackOff".to_string(),
            message: "Back-off restarting\nfailed container".to_string(),
            source: "kubelet".to_string(),
            last_seen: Some(now - TimeDelta::minutes(5)),
        }];

        let text = render(|out| print_events(out, &events, true, now));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("TYPE"));
        assert!(lines[2].starts_with("Warning"));
        assert!(lines[2].contains("5m"));
        assert!(lines[2].ends_with("Back-off restarting failed container"));
    }

    #[test]
    fn test_no_events() {
        let text = render(|out| print_events(out, &[], true, Utc::now()));
        assert_eq!(text, "\nEvents: <none>\n");
    }
}
