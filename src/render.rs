use crate::config::RenderConfig;
use crate::ir::{EdgeKind, FlowGraph, NodeKind};
use crate::layout::Layout;
use crate::layout::geometry::Rect;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Draws a layout as a plain SVG preview: group boxes, step and tool
/// rectangles labelled with their ids, and straight edges between centres.
pub fn render_svg(graph: &FlowGraph, layout: &Layout, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let pad = config.padding;
    let origin_x = layout.bounds.x - pad;
    let origin_y = layout.bounds.y - pad;
    let width = (layout.width() + pad * 2.0).max(200.0);
    let height = (layout.height() + pad * 2.0).max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{origin_x} {origin_y} {width} {height}\">",
    ));

    svg.push_str(&format!(
        "<rect x=\"{origin_x}\" y=\"{origin_y}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.route_color
    ));
    svg.push_str("</defs>");

    // outer groups first so nested boxes stay visible
    let mut groups: Vec<_> = layout
        .boxes
        .iter()
        .filter(|entry| entry.kind == NodeKind::Group)
        .collect();
    groups.sort_by(|a, b| {
        (b.rect.width * b.rect.height)
            .partial_cmp(&(a.rect.width * a.rect.height))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for group in groups {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{}\" stroke=\"{}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
            group.rect.x,
            group.rect.y,
            group.rect.width,
            group.rect.height,
            theme.group_fill,
            theme.group_border
        ));
        let label_x = group.rect.x + 12.0;
        let label_y = group.rect.y + 20.0;
        svg.push_str(&format!(
            "<text x=\"{label_x:.2}\" y=\"{label_y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.text_color,
            escape_xml(&group.id)
        ));
    }

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (layout.node_box(&edge.source), layout.node_box(&edge.target))
        else {
            continue;
        };
        let (x1, y1) = from.rect.center();
        let (x2, y2) = clip_to_border(&to.rect, (x1, y1));
        let (color, dash) = match edge.kind {
            EdgeKind::Tool => (theme.tool_edge_color.as_str(), " stroke-dasharray=\"4 3\""),
            _ => (theme.route_color.as_str(), ""),
        };
        svg.push_str(&format!(
            "<path d=\"M {x1:.2} {y1:.2} L {x2:.2} {y2:.2}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#arrow)\"/>",
        ));
    }

    for entry in layout.boxes.iter().filter(|entry| entry.kind != NodeKind::Group) {
        let (fill, stroke, radius) = match entry.kind {
            NodeKind::Tool => (&theme.tool_fill, &theme.tool_border, 18.0),
            _ => (&theme.step_fill, &theme.step_border, 10.0),
        };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius}\" ry=\"{radius}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            entry.rect.x,
            entry.rect.y,
            entry.rect.width,
            entry.rect.height,
            fill,
            stroke
        ));
        let (center_x, center_y) = entry.rect.center();
        let baseline = center_y + theme.font_size / 3.0;
        svg.push_str(&format!(
            "<text x=\"{center_x:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.text_color,
            escape_xml(&entry.id)
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Point where the segment from `from` to the centre of `rect` crosses the
/// rect border.
fn clip_to_border(rect: &Rect, from: (f32, f32)) -> (f32, f32) {
    let (cx, cy) = rect.center();
    let dx = from.0 - cx;
    let dy = from.1 - cy;
    if dx == 0.0 && dy == 0.0 {
        return (cx, cy);
    }
    let half_w = rect.width / 2.0;
    let half_h = rect.height / 2.0;
    let scale_x = if dx != 0.0 { half_w / dx.abs() } else { f32::INFINITY };
    let scale_y = if dy != 0.0 { half_h / dy.abs() } else { f32::INFINITY };
    let scale = scale_x.min(scale_y).min(1.0);
    (cx + dx * scale, cy + dy * scale)
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;

    #[test]
    fn render_svg_basic() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("Alpha", NodeKind::Step);
        graph.ensure_node("Beta", NodeKind::Step);
        graph.ensure_node("search<web>", NodeKind::Tool);
        graph.push_edge("Alpha", "Beta", EdgeKind::Route);
        graph.push_edge("Alpha", "search<web>", EdgeKind::Tool);
        let layout = compute_layout(&graph, &LayoutConfig::default());
        let svg = render_svg(&graph, &layout, &Theme::modern(), &RenderConfig::default());
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains("search&lt;web&gt;"));
        // one path per edge; the arrow marker path lives in <defs>
        assert_eq!(svg.matches("marker-end=\"url(#arrow)\"").count(), 2);
        assert_eq!(svg.matches("<marker ").count(), 1);
    }

    #[test]
    fn clip_stops_at_rect_border() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(clip_to_border(&rect, (50.0, -100.0)), (50.0, 0.0));
        assert_eq!(clip_to_border(&rect, (300.0, 25.0)), (100.0, 25.0));
    }
}
