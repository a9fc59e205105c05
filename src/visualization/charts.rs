//! Chart renderers
//!
//! Each public function creates a fresh SVG surface, draws one figure and
//! returns the captured bytes wrapped in a [`Visualization`]. The surface is
//! dropped before the function returns.

use super::Visualization;
use crate::analysis::stats::{auto_bin_count, gaussian_kde, histogram, BoxStats};
use crate::error::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

type Surface<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const BAR_BLUE: RGBColor = RGBColor(76, 114, 176);
const KDE_NAVY: RGBColor = RGBColor(31, 58, 110);
const MISSING_GRAY: RGBColor = RGBColor(190, 190, 190);

const KDE_POINTS: usize = 200;

/// Draw onto a private SVG surface and return the document bytes
pub fn render_svg<F>(size: (u32, u32), draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Surface<'_>) -> Result<()>,
{
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(buffer.into_bytes())
}

/// Widen a degenerate range so plotters has something to map
fn padded_range(lo: f64, hi: f64, pad_fraction: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * pad_fraction;
    (lo - pad, hi + pad)
}

fn min_max(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn label_style(size: u32) -> TextStyle<'static> {
    ("sans-serif", size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Histogram with a KDE overlay next to a box plot.
///
/// `values` are the non-missing values of the column.
pub fn distribution_chart(column: &str, values: &[f64], size: (u32, u32)) -> Result<Visualization> {
    let bytes = render_svg(size, |root| {
        let panels = root.split_evenly((1, 2));
        draw_histogram(&panels[0], column, values)?;
        draw_boxplot(&panels[1], column, values)?;
        Ok(())
    })?;
    Ok(Visualization::svg(format!("{}_distribution", column), bytes))
}

fn draw_histogram(area: &Surface<'_>, column: &str, values: &[f64]) -> Result<()> {
    let bins = auto_bin_count(values);
    let (edges, counts) = histogram(values, bins);
    let lo = edges.first().copied().unwrap_or(0.0);
    let hi = edges.last().copied().unwrap_or(1.0);
    let bin_width = (hi - lo) / bins as f64;

    // KDE is a density; scale it to the count axis
    let scale = values.len() as f64 * bin_width;
    let kde: Vec<(f64, f64)> = gaussian_kde(values, lo, hi, KDE_POINTS)
        .into_iter()
        .map(|(x, d)| (x, d * scale))
        .collect();

    let top = counts
        .iter()
        .map(|&c| c as f64)
        .chain(kde.iter().map(|p| p.1))
        .fold(1.0_f64, f64::max)
        * 1.1;
    let (x_lo, x_hi) = padded_range(lo, hi, 0.02);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("Distribution of {}", column), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_lo..x_hi, 0.0..top)?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Count")
        .disable_x_mesh()
        .draw()?;

    chart.draw_series(edges.windows(2).zip(counts.iter()).map(|(edge, &count)| {
        Rectangle::new([(edge[0], 0.0), (edge[1], count as f64)], BAR_BLUE.mix(0.7).filled())
    }))?;
    chart.draw_series(edges.windows(2).zip(counts.iter()).map(|(edge, &count)| {
        Rectangle::new([(edge[0], 0.0), (edge[1], count as f64)], WHITE.stroke_width(1))
    }))?;

    if !kde.is_empty() {
        chart.draw_series(LineSeries::new(kde, KDE_NAVY.stroke_width(2)))?;
    }
    Ok(())
}

fn draw_boxplot(area: &Surface<'_>, column: &str, values: &[f64]) -> Result<()> {
    let (lo, hi) = min_max(values.iter().copied());
    let (y_lo, y_hi) = padded_range(lo, hi, 0.05);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("Box Plot of {}", column), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..1.0, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_labels(0)
        .y_desc(column)
        .disable_x_mesh()
        .draw()?;

    let stats = match BoxStats::from_values(values) {
        Some(stats) => stats,
        None => return Ok(()),
    };

    let (left, right, center) = (0.3, 0.7, 0.5);
    let line = BLACK.stroke_width(2);

    chart.draw_series(std::iter::once(Rectangle::new(
        [(left, stats.q1), (right, stats.q3)],
        BAR_BLUE.mix(0.6).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(left, stats.q1), (right, stats.q3)],
        line,
    )))?;

    let segments = vec![
        vec![(left, stats.median), (right, stats.median)],
        vec![(center, stats.q3), (center, stats.whisker_high)],
        vec![(center, stats.q1), (center, stats.whisker_low)],
        vec![(0.4, stats.whisker_high), (0.6, stats.whisker_high)],
        vec![(0.4, stats.whisker_low), (0.6, stats.whisker_low)],
    ];
    chart.draw_series(segments.into_iter().map(|points| PathElement::new(points, line)))?;

    chart.draw_series(
        stats
            .outliers
            .iter()
            .map(|&v| Circle::new((center, v), 3, BLACK.stroke_width(1))),
    )?;
    Ok(())
}

/// Horizontal bars of category frequencies.
///
/// `counts` is expected in display order (most frequent first); with
/// `max_bars` set only that many leading entries are drawn.
pub fn frequency_chart(
    column: &str,
    counts: &[(String, usize)],
    max_bars: Option<usize>,
    size: (u32, u32),
) -> Result<Visualization> {
    let limit = max_bars.map_or(counts.len(), |m| m.max(1));
    let shown = &counts[..counts.len().min(limit)];
    let caption = if shown.len() < counts.len() {
        format!("Top {} values of {} ({} distinct)", shown.len(), column, counts.len())
    } else {
        format!("Value counts of {}", column)
    };

    let bars: Vec<(String, f64)> = shown.iter().map(|(k, c)| (k.clone(), *c as f64)).collect();
    let bytes = render_svg(size, |root| {
        draw_horizontal_bars(root, &caption, "Count", &bars, |c| format!("{}", *c as u64))
    })?;
    Ok(Visualization::svg(format!("{}_distribution", column), bytes))
}

/// Shared horizontal bar layout; `bars[0]` is drawn on top.
fn draw_horizontal_bars(
    root: &Surface<'_>,
    caption: &str,
    x_desc: &str,
    bars: &[(String, f64)],
    value_label: impl Fn(&f64) -> String,
) -> Result<()> {
    let n = bars.len();
    // bar rank r sits at y = n - 1 - r so the first bar is on top
    let label_at = |y: &f64| -> String {
        let r = y.round();
        if (y - r).abs() > 1e-6 || r < 0.0 || r as usize >= n {
            return String::new();
        }
        bars[n - 1 - r as usize].0.clone()
    };

    let largest = bars.iter().map(|b| b.1).fold(0.0_f64, f64::max);
    let x_max = if largest > 0.0 { largest * 1.15 } else { 1.0 };
    let longest = bars.iter().map(|b| b.0.chars().count()).max().unwrap_or(0);
    let y_label_width = (longest as u32 * 7 + 20).clamp(60, 260);

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(y_label_width)
        .build_cartesian_2d(0.0..x_max, -0.5..(n.max(1) as f64 - 0.5))?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_labels(n.max(1))
        .y_label_formatter(&label_at)
        .disable_y_mesh()
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(rank, (_, value))| {
        let y = (n - 1 - rank) as f64;
        Rectangle::new([(0.0, y - 0.4), (*value, y + 0.4)], BAR_BLUE.filled())
    }))?;

    let annotation = ("sans-serif", 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(bars.iter().enumerate().map(|(rank, (_, value))| {
        let y = (n - 1 - rank) as f64;
        Text::new(format!(" {}", value_label(value)), (*value, y), annotation.clone())
    }))?;
    Ok(())
}

/// Blue-white-red colour for a correlation in [-1, 1]
pub fn diverging_color(r: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if r.is_nan() {
        return MISSING_GRAY;
    }
    let t = r.clamp(-1.0, 1.0);
    let (from, to, w) = if t < 0.0 { (MID, COLD, -t) } else { (MID, HOT, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Annotated correlation matrix with a colour bar
pub fn correlation_heatmap(names: &[String], matrix: &[Vec<f64>], size: (u32, u32)) -> Result<Visualization> {
    let k = names.len();
    let bytes = render_svg(size, |root| {
        let (width, _) = root.dim_in_pixel();
        let (main, legend) = root.split_horizontally(width as i32 - 110);

        // cell (i, j) is centred on (j, k - 1 - i) so row 0 is on top
        let x_label = |x: &f64| index_label(names, *x, false);
        let y_label = |y: &f64| index_label(names, *y, true);
        let span = -0.5..(k as f64 - 0.5);

        let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        let label_size = (longest as u32 * 7 + 20).clamp(60, 220);

        let mut chart = ChartBuilder::on(&main)
            .caption("Correlation Heatmap", ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(label_size.min(120))
            .y_label_area_size(label_size)
            .build_cartesian_2d(span.clone(), span)?;

        chart
            .configure_mesh()
            .x_labels(k)
            .y_labels(k)
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .disable_mesh()
            .draw()?;

        let cells = (0..k).flat_map(|i| (0..k).map(move |j| (i, j)));
        chart.draw_series(cells.clone().map(|(i, j)| {
            let (x, y) = (j as f64, (k - 1 - i) as f64);
            Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                diverging_color(matrix[i][j]).filled(),
            )
        }))?;

        let font_size = if k > 12 { 9 } else { 13 };
        chart.draw_series(cells.map(|(i, j)| {
            let r = matrix[i][j];
            let text = if r.is_nan() { "nan".to_string() } else { format!("{:.2}", r) };
            let color: &'static RGBColor = if r.abs() > 0.6 { &WHITE } else { &BLACK };
            Text::new(
                text,
                (j as f64, (k - 1 - i) as f64),
                label_style(font_size).color(color),
            )
        }))?;

        draw_color_bar(&legend)?;
        Ok(())
    })?;
    Ok(Visualization::svg("correlation_heatmap", bytes))
}

fn index_label(names: &[String], pos: f64, flipped: bool) -> String {
    let k = names.len();
    let r = pos.round();
    if (pos - r).abs() > 1e-6 || r < 0.0 || r as usize >= k {
        return String::new();
    }
    let idx = if flipped { k - 1 - r as usize } else { r as usize };
    names[idx].clone()
}

fn draw_color_bar(area: &Surface<'_>) -> Result<()> {
    let steps = 100;
    let mut bar = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..1.0, -1.0..1.0)?;

    bar.configure_mesh()
        .x_labels(0)
        .y_labels(5)
        .disable_mesh()
        .draw()?;

    bar.draw_series((0..steps).map(|s| {
        let lo = -1.0 + 2.0 * s as f64 / steps as f64;
        let hi = -1.0 + 2.0 * (s + 1) as f64 / steps as f64;
        Rectangle::new([(0.0, lo), (1.0, hi)], diverging_color((lo + hi) / 2.0).filled())
    }))?;
    Ok(())
}

/// Scatter of actual against predicted values with the identity line over
/// the range of the actual values
pub fn actual_vs_predicted(
    target: &str,
    actual: &[f64],
    predicted: &[f64],
    size: (u32, u32),
) -> Result<Visualization> {
    let bytes = render_svg(size, |root| {
        let (a_lo, a_hi) = min_max(actual.iter().copied());
        let (lo, hi) = min_max(actual.iter().chain(predicted.iter()).copied());
        let (lo, hi) = padded_range(lo, hi, 0.05);

        let mut chart = ChartBuilder::on(root)
            .caption(format!("Actual vs Predicted {}", target), ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(65)
            .build_cartesian_2d(lo..hi, lo..hi)?;

        chart
            .configure_mesh()
            .x_desc("Actual")
            .y_desc("Predicted")
            .draw()?;

        chart.draw_series(
            actual
                .iter()
                .zip(predicted.iter())
                .map(|(&a, &p)| Circle::new((a, p), 3, BAR_BLUE.mix(0.6).filled())),
        )?;

        if a_lo.is_finite() && a_hi.is_finite() {
            chart.draw_series(LineSeries::new(
                vec![(a_lo, a_lo), (a_hi, a_hi)],
                BLACK.stroke_width(2),
            ))?;
        }
        Ok(())
    })?;
    Ok(Visualization::svg("actual_vs_predicted", bytes))
}

/// Top `top_n` features by importance, most important on top
pub fn feature_importance(
    importances: &[(String, f64)],
    top_n: usize,
    size: (u32, u32),
) -> Result<Visualization> {
    let mut ranked: Vec<(String, f64)> = importances.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n.max(1));

    let caption = format!("Top {} Feature Importances", ranked.len());
    let bytes = render_svg(size, |root| {
        draw_horizontal_bars(root, &caption, "Importance", &ranked, |v| format!("{:.3}", v))
    })?;
    Ok(Visualization::svg("feature_importance", bytes))
}
