//! Count table rendering.
//!
//! Renders an aggregate as a kubectl-style table with a trailing total row.

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::age::format_age;
use crate::types::{Aggregate, CountResult};

/// Shown in the namespace column for an all-namespaces scope.
const ALL_NAMESPACES: &str = "<all>";

/// Row for the count table.
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Label selector")]
    label_selector: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Count")]
    count: String,
}

/// Row for the count table with age columns.
#[derive(Tabled)]
struct AgedCountRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Label selector")]
    label_selector: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Count")]
    count: String,
    #[tabled(rename = "Newest")]
    newest: String,
    #[tabled(rename = "Oldest")]
    oldest: String,
}

impl CountRow {
    fn from_result(r: &CountResult) -> Self {
        Self {
            cluster: r.cluster.clone(),
            namespace: namespace_label(&r.namespace),
            label_selector: r.label_selector.clone(),
            kind: r.kind.to_string(),
            count: r.count.to_string(),
        }
    }

    fn separator() -> Self {
        Self {
            cluster: "-------".to_string(),
            namespace: "---------".to_string(),
            label_selector: "--------------".to_string(),
            kind: "----".to_string(),
            count: "-----".to_string(),
        }
    }

    fn total(total: usize) -> Self {
        Self {
            cluster: "Total".to_string(),
            namespace: String::new(),
            label_selector: String::new(),
            kind: String::new(),
            count: total.to_string(),
        }
    }

    fn with_age(self, newest: String, oldest: String) -> AgedCountRow {
        AgedCountRow {
            cluster: self.cluster,
            namespace: self.namespace,
            label_selector: self.label_selector,
            kind: self.kind,
            count: self.count,
            newest,
            oldest,
        }
    }
}

fn namespace_label(namespace: &str) -> String {
    if namespace.is_empty() {
        ALL_NAMESPACES.to_string()
    } else {
        namespace.to_string()
    }
}

/// Render the aggregate in its current order.
///
/// Ages are computed relative to `now`. An empty aggregate renders as an
/// empty string, without headers.
pub fn render(aggregate: &Aggregate, show_age: bool, now: DateTime<Utc>) -> String {
    if aggregate.is_empty() {
        return String::new();
    }

    let total = CountRow::total(aggregate.total());
    let mut table = if show_age {
        let mut rows = vec![CountRow::separator().with_age("------".into(), "------".into())];
        rows.extend(aggregate.results.iter().map(|r| {
            CountRow::from_result(r)
                .with_age(format_age(r.newest, now), format_age(r.oldest, now))
        }));
        rows.push(total.with_age(String::new(), String::new()));
        Table::new(&rows)
    } else {
        let mut rows = vec![CountRow::separator()];
        rows.extend(aggregate.results.iter().map(CountRow::from_result));
        rows.push(total);
        Table::new(&rows)
    };

    apply_table_style(&mut table);
    trim_trailing_padding(&table.to_string())
}

/// Strip the column padding tabled leaves after the last cell of each line.
fn trim_trailing_padding(rendered: &str) -> String {
    rendered
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the aggregate table to stdout.
pub fn print(aggregate: &Aggregate, show_age: bool) {
    let rendered = render(aggregate, show_age, Utc::now());
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
}

/// Apply kubectl-style table formatting: no borders, no separators, 2-space column gap.
fn apply_table_style(table: &mut Table) {
    use tabled::settings::object::Columns;
    use tabled::settings::themes::Theme;
    use tabled::settings::{Modify, Padding};

    let mut theme = Theme::from_style(Style::empty());
    theme.remove_horizontal_lines();
    table.with(theme);
    table.with(Modify::new(Columns::new(..)).with(Padding::new(0, 2, 0, 0)));
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::kind::Kind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn result(cluster: &str, namespace: &str, count: usize) -> CountResult {
        CountResult {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
            kind: Kind::Pod,
            label_selector: String::new(),
            count,
            newest: None,
            oldest: None,
        }
    }

    fn lines(rendered: &str) -> Vec<&str> {
        rendered.lines().map(str::trim_end).collect()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Aggregate::default(), false, now()), "");
        assert_eq!(render(&Aggregate::default(), true, now()), "");
    }

    #[test]
    fn test_render_rows_and_total() {
        let aggregate = Aggregate {
            results: vec![result("prod", "default", 10), result("staging", "default", 0)],
            failures: vec![],
        };
        let rendered = render(&aggregate, false, now());
        let lines = lines(&rendered);

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Cluster"));
        assert!(lines[0].contains("Namespace"));
        assert!(lines[0].contains("Label selector"));
        assert!(lines[0].ends_with("Count"));
        assert!(lines[1].starts_with("-------"));
        assert!(lines[2].starts_with("prod"));
        assert!(lines[2].ends_with("10"));
        assert!(lines[3].starts_with("staging"));
        assert!(lines[3].ends_with('0'));
        assert!(lines[4].starts_with("Total"));
        assert!(lines[4].ends_with("10"));
        assert!(!rendered.contains("Newest"));
    }

    #[test]
    fn test_render_has_no_trailing_whitespace() {
        let aggregate = Aggregate {
            results: vec![result("prod", "default", 10), result("staging", "", 0)],
            failures: vec![],
        };

        for show_age in [false, true] {
            let rendered = render(&aggregate, show_age, now());
            for line in rendered.lines() {
                assert_eq!(line, line.trim_end(), "trailing whitespace in {:?}", line);
            }
            assert!(rendered.lines().next().unwrap().ends_with(if show_age {
                "Oldest"
            } else {
                "Count"
            }));
        }
    }

    #[test]
    fn test_render_columns_align() {
        let aggregate = Aggregate {
            results: vec![
                result("a-very-long-cluster-name", "default", 1),
                result("b", "default", 1),
            ],
            failures: vec![],
        };
        let rendered = render(&aggregate, false, now());
        let lines = lines(&rendered);

        let column = lines[0].find("Namespace").unwrap();
        assert_eq!(lines[2].find("default"), Some(column));
        assert_eq!(lines[3].find("default"), Some(column));
    }

    #[test]
    fn test_render_all_namespaces() {
        let aggregate = Aggregate {
            results: vec![result("prod", "", 3)],
            failures: vec![],
        };
        let rendered = render(&aggregate, false, now());
        assert!(rendered.contains("<all>"));
    }

    #[test]
    fn test_render_with_age() {
        let mut with_age = result("prod", "default", 2);
        with_age.newest = Some(now() - Duration::hours(5));
        with_age.oldest = Some(now() - Duration::hours(72));
        let aggregate = Aggregate {
            results: vec![with_age, result("staging", "default", 0)],
            failures: vec![],
        };

        let rendered = render(&aggregate, true, now());
        let lines = lines(&rendered);

        assert!(lines[0].contains("Newest"));
        assert!(lines[0].ends_with("Oldest"));
        assert!(lines[2].contains("5h"));
        assert!(lines[2].ends_with("3d"));
        assert!(lines[3].ends_with("<unknown>"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut aged = result("prod", "default", 7);
        aged.newest = Some(now() - Duration::minutes(3));
        aged.oldest = Some(now() - Duration::days(30));
        let aggregate = Aggregate {
            results: vec![aged, result("staging", "web", 1)],
            failures: vec![],
        };

        assert_eq!(
            render(&aggregate, true, now()),
            render(&aggregate, true, now())
        );
        assert_eq!(
            render(&aggregate, false, now()),
            render(&aggregate, false, now())
        );
    }

    #[test]
    fn test_failures_are_not_rendered() {
        let aggregate = Aggregate {
            results: vec![],
            failures: vec![crate::types::CountFailure {
                cluster: "down".to_string(),
                namespace: "default".to_string(),
                kind: Kind::Pod,
                label_selector: String::new(),
                error: "connection refused".to_string(),
            }],
        };
        assert_eq!(render(&aggregate, false, now()), "");
    }
}
