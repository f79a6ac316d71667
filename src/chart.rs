//! ECharts plumbing shared by the user and admin dashboards.
//!
//! Charts are built with `charming`, serialized to JSON and initialized by a
//! small script added to the page head.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{Bar, Line},
};
use maud::{Markup, PreEscaped, html};

use crate::{html::HeadElement, period::MonthKey};

const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

/// A chart with its HTML container ID and ECharts configuration.
pub struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

impl DashboardChart {
    pub fn new(id: &'static str, chart: &Chart) -> Self {
        Self {
            id,
            options: chart.to_string(),
        }
    }
}

/// Renders the HTML containers for `charts`.
pub fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// The head elements that load ECharts and initialize `charts`, with dark
/// mode support and responsive resizing.
pub fn charts_head_elements(charts: &[DashboardChart]) -> [HeadElement; 2] {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script =
        format!("document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});");

    [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        HeadElement::ScriptSource(PreEscaped(wrapped_script)),
    ]
}

fn base_chart(title: &str, subtitle: &str, months: &[MonthKey]) -> Chart {
    let labels: Vec<String> = months.iter().map(MonthKey::short_label).collect();

    Chart::new()
        .title(Title::new().text(title).subtext(subtitle))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
}

/// Bars for each month's budget with a line for what was spent.
///
/// `points` holds the month, its budget and its spending, oldest first.
pub fn budget_vs_spending_chart(points: &[(MonthKey, f64, f64)]) -> Chart {
    let months: Vec<MonthKey> = points.iter().map(|(month, _, _)| *month).collect();
    let budgets: Vec<f64> = points.iter().map(|(_, budget, _)| *budget).collect();
    let spending: Vec<f64> = points.iter().map(|(_, _, spent)| *spent).collect();

    base_chart(
        "Budget vs spending",
        &format!("Last {} months", points.len()),
        &months,
    )
    .legend(Legend::new().top("1%").right("4%"))
    .series(Bar::new().name("Budget").data(budgets))
    .series(Line::new().name("Spent").data(spending))
}

/// Net spending across all users for each month, oldest first.
pub fn total_spending_chart(points: &[(MonthKey, f64)]) -> Chart {
    let months: Vec<MonthKey> = points.iter().map(|(month, _)| *month).collect();
    let spending: Vec<f64> = points.iter().map(|(_, spent)| *spent).collect();

    base_chart(
        "Spending",
        &format!("All users, last {} months", points.len()),
        &months,
    )
    .series(Bar::new().name("Spent").data(spending))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_tests {
    use scraper::{Html, Selector};
    use time::Month;

    use crate::{
        chart::{
            DashboardChart, budget_vs_spending_chart, charts_head_elements, charts_view,
            total_spending_chart,
        },
        html::HeadElement,
        period::MonthKey,
    };

    #[test]
    fn budget_chart_has_month_labels_and_series() {
        let points = [
            (MonthKey::new(2025, Month::September), 100.0, 80.0),
            (MonthKey::new(2025, Month::October), 100.0, 130.0),
        ];

        let options = budget_vs_spending_chart(&points).to_string();

        assert!(options.contains("Sep 25"), "{options}");
        assert!(options.contains("Oct 25"), "{options}");
        assert!(options.contains("\"Budget\""), "{options}");
        assert!(options.contains("\"Spent\""), "{options}");
    }

    #[test]
    fn spending_chart_mentions_month_count() {
        let points = [(MonthKey::new(2025, Month::October), 42.0)];

        let options = total_spending_chart(&points).to_string();

        assert!(options.contains("last 1 months"), "{options}");
    }

    #[test]
    fn renders_container_and_script_per_chart() {
        let charts = [DashboardChart::new(
            "budget-chart",
            &total_spending_chart(&[]),
        )];

        let html = Html::parse_fragment(&charts_view(&charts).into_string());
        assert!(
            html.select(&Selector::parse("#budget-chart").unwrap())
                .next()
                .is_some()
        );

        match &charts_head_elements(&charts) {
            [HeadElement::ScriptLink(link), HeadElement::ScriptSource(script)] => {
                assert!(link.ends_with(".js"));
                assert!(script.0.contains("getElementById(\"budget-chart\")"));
            }
            _ => panic!("expected a script link followed by the chart script"),
        }
    }
}
