use crate::aggregate::{Grouped, HistogramBin, TrendPoint};
use crate::report::DashboardReport;
use plotters::element::Pie;
use plotters::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

pub type ChartResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Available graph types supported by the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphType {
    /// One bar per category
    Bar,

    /// Share of each category, drawn as a donut
    Pie,

    /// Values in order, joined by a line with markers
    Line,

    /// Counts per value bin
    Histogram,
}

/// Configuration options for graph generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,

    pub graph_type: GraphType,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
            width: 800,
            height: 500,
            graph_type: GraphType::Bar,
        }
    }
}

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

fn to_f64(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Vertical range that always includes zero, with some headroom
fn value_range(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let max = values.clone().fold(0.0, f64::max);
    let min = values.fold(0.0, f64::min);
    let top = if max > 0.0 { max * 1.1 } else { 1.0 };
    let bottom = if min < 0.0 { min * 1.1 } else { 0.0 };
    (bottom, top)
}

/// Renders labelled values as an SVG document
///
/// # Arguments
/// * `data` - `(label, value)` pairs in display order
/// * `options` - Graph styling and type; `Histogram` is drawn as bars here,
///   use `create_histogram` for binned data
///
/// # Examples
/// ```
/// use sales_dashboard::graph::{create_graph, GraphOptions, GraphType};
///
/// let data = vec![("BO".to_string(), 20.0), ("AR".to_string(), 15.0)];
/// let options = GraphOptions {
///     title: "Ventas por País".to_string(),
///     graph_type: GraphType::Pie,
///     ..GraphOptions::default()
/// };
/// let svg = create_graph(&data, &options).unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn create_graph(data: &[(String, f64)], options: &GraphOptions) -> ChartResult<String> {
    match options.graph_type {
        GraphType::Bar | GraphType::Histogram => create_bar_graph(data, options),
        GraphType::Pie => create_pie_graph(data, options),
        GraphType::Line => create_line_graph(data, options),
    }
}

fn create_bar_graph(data: &[(String, f64)], options: &GraphOptions) -> ChartResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = data.len().max(1) as i32;
        let (bottom, top) = value_range(data.iter().map(|(_, y)| *y));

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), bottom..top)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n as usize)
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) => data
                    .get(*i as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(data.iter().enumerate().map(|(i, (_, y))| {
            let i = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *y)],
                PALETTE[0].filled(),
            );
            bar.set_margin(0, 0, 4, 4);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

fn create_pie_graph(data: &[(String, f64)], options: &GraphOptions) -> ChartResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(&options.title, ("sans-serif", 24).into_font())?;

        // Negative slices cannot be drawn
        let sizes: Vec<f64> = data.iter().map(|(_, v)| v.max(0.0)).collect();
        let (w, h) = area.dim_in_pixel();

        if sizes.iter().sum::<f64>() <= 0.0 {
            area.draw(&Text::new(
                "Sin datos",
                ((w / 2) as i32 - 40, (h / 2) as i32),
                ("sans-serif", 20).into_font(),
            ))?;
        } else {
            let center = ((w / 2) as i32, (h / 2) as i32);
            let radius = w.min(h) as f64 * 0.35;
            let colors: Vec<RGBColor> = (0..sizes.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();
            let labels: Vec<String> = data.iter().map(|(label, _)| label.clone()).collect();

            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.donut_hole(radius * 0.3);
            pie.label_style(("sans-serif", 14).into_font());
            pie.percentages(("sans-serif", 12).into_font().color(&WHITE));
            area.draw(&pie)?;
        }

        root.present()?;
    }
    Ok(svg)
}

fn create_line_graph(data: &[(String, f64)], options: &GraphOptions) -> ChartResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let last = data.len().saturating_sub(1).max(1) as f64;
        let (bottom, top) = value_range(data.iter().map(|(_, y)| *y));

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..last + 0.5, bottom..top)?;

        chart
            .configure_mesh()
            .x_labels(data.len().max(1))
            .x_label_formatter(&|x| {
                let i = x.round();
                if i < 0.0 || (x - i).abs() > 0.01 {
                    return String::new();
                }
                data.get(i as usize).map(|(label, _)| label.clone()).unwrap_or_default()
            })
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        let points: Vec<(f64, f64)> = data.iter().enumerate().map(|(i, (_, y))| (i as f64, *y)).collect();

        chart.draw_series(LineSeries::new(points.iter().copied(), PALETTE[3].stroke_width(3)))?;
        chart.draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 5, PALETTE[3].filled())))?;

        root.present()?;
    }
    Ok(svg)
}

/// Renders binned counts as adjacent bars
pub fn create_histogram(bins: &[HistogramBin], options: &GraphOptions) -> ChartResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (mut left, mut right) = match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => (first.lower, last.upper),
            _ => (0.0, 1.0),
        };
        if left == right {
            left -= 0.5;
            right += 0.5;
        }
        let (_, top) = value_range(bins.iter().map(|b| b.count as f64));

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(left..right, 0.0..top)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(bins.iter().map(|b| {
            let (lower, upper) = if b.lower == b.upper { (left, right) } else { (b.lower, b.upper) };
            let mut bar = Rectangle::new([(lower, 0.0), (upper, b.count as f64)], PALETTE[4].filled());
            // gap between bars
            bar.set_margin(0, 0, 2, 2);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

/// The charts shown on the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chart {
    MonthlySales,
    CountrySales,
    ProductQuantity,
    QuarterlySales,
    Trend,
    Distribution,
    TopCustomers,
    CustomerSales,
}

impl FromStr for Chart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chart::ALL
            .iter()
            .copied()
            .find(|chart| chart.name() == s)
            .ok_or_else(|| format!("unknown chart: {}", s))
    }
}

fn decimal_pairs(grouped: &Grouped<Decimal>) -> Vec<(String, f64)> {
    grouped.pairs().into_iter().map(|(k, v)| (k.to_string(), to_f64(v))).collect()
}

fn trend_pairs(trend: &[TrendPoint]) -> Vec<(String, f64)> {
    trend
        .iter()
        .map(|p| (p.month_end.format("%Y-%m").to_string(), to_f64(&p.total)))
        .collect()
}

impl Chart {
    pub const ALL: [Chart; 8] = [
        Chart::MonthlySales,
        Chart::CountrySales,
        Chart::ProductQuantity,
        Chart::QuarterlySales,
        Chart::Trend,
        Chart::Distribution,
        Chart::TopCustomers,
        Chart::CustomerSales,
    ];

    /// Path segment used by the HTTP API
    pub fn name(&self) -> &'static str {
        match self {
            Chart::MonthlySales => "monthly",
            Chart::CountrySales => "country",
            Chart::ProductQuantity => "product",
            Chart::QuarterlySales => "quarterly",
            Chart::Trend => "trend",
            Chart::Distribution => "distribution",
            Chart::TopCustomers => "top-customers",
            Chart::CustomerSales => "customers",
        }
    }

    pub fn options(&self) -> GraphOptions {
        let (title, x_label, y_label, graph_type) = match self {
            Chart::MonthlySales => ("Ventas Totales por Mes", "Mes", "Ventas Totales", GraphType::Bar),
            Chart::CountrySales => ("Ventas por País", "", "", GraphType::Pie),
            Chart::ProductQuantity => ("Ventas por Producto", "Producto", "Cantidad Vendida", GraphType::Bar),
            Chart::QuarterlySales => ("Ventas Trimestrales", "Trimestre", "Ventas Totales", GraphType::Line),
            Chart::Trend => ("Tendencia de Ventas Mensuales", "Fecha", "Ventas Totales", GraphType::Line),
            Chart::Distribution => ("Distribución de Ventas", "Ventas", "Frecuencia", GraphType::Histogram),
            Chart::TopCustomers => ("Top Clientes por Ventas", "Cliente", "Ventas Totales", GraphType::Bar),
            Chart::CustomerSales => ("Distribución de Ventas por Cliente", "", "", GraphType::Pie),
        };
        GraphOptions {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            graph_type,
            ..GraphOptions::default()
        }
    }

    pub fn render(&self, report: &DashboardReport) -> ChartResult<String> {
        let options = self.options();
        let data = match self {
            Chart::Distribution => return create_histogram(&report.distribution, &options),
            Chart::MonthlySales => decimal_pairs(&report.monthly_sales),
            Chart::CountrySales => decimal_pairs(&report.country_sales),
            Chart::ProductQuantity => report
                .product_quantity
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), *v as f64))
                .collect(),
            Chart::QuarterlySales => decimal_pairs(&report.quarterly_sales),
            Chart::Trend => trend_pairs(&report.trend),
            Chart::TopCustomers => decimal_pairs(&report.top_customers),
            Chart::CustomerSales => decimal_pairs(&report.customer_sales),
        };
        create_graph(&data, &options)
    }
}
