use super::*;
use kurbo::{Point, Rect};

use crate::aspect::analysis::PathAnalysis;
use crate::aspect::fill::Fill;
use crate::aspect::registry::AspectKind;
use crate::aspect::stroke::Stroke;
use crate::document::storage::Document;
use crate::foundation::color::Color;

fn sample_document() -> (Document, PageId, GraphicId, GraphicId, GraphicId, GraphicId) {
    let mut doc = Document::new();
    let page = doc.add_page();
    doc.add_layer("base").unwrap();
    doc.add_layer("notes").unwrap();

    // A rectangle with two archived aspects and one subgraphic.
    let mut rect = Graphic::new(GraphicShape::Rectangle, Rect::new(0.0, 0.0, 100.0, 50.0));
    rect.add_aspect(Aspect::Fill(Fill::new(Color::rgba(0.9, 0.2, 0.2, 1.0))));
    rect.add_aspect(Aspect::Stroke(Stroke {
        width: 4.0,
        dash: Some("1 1 2 1".parse().unwrap()),
        ..Stroke::default()
    }));
    let rect_id = doc.add_graphic(rect, page, "base").unwrap();

    let child = Graphic::new(GraphicShape::Ellipse, Rect::new(10.0, 10.0, 30.0, 30.0));
    let child_id = doc.add_graphic(child, page, "base").unwrap();
    doc.add_subgraphic(rect_id, child_id).unwrap();

    // A pen graphic whose path must archive verbatim, plus a derived-only
    // aspect that must not.
    let mut pen_path = BezPath::new();
    pen_path.move_to((200.0, 0.0));
    pen_path.curve_to((210.0, 5.0), (220.0, 15.0), (230.0, 20.0));
    let mut pen = Graphic::with_path(pen_path);
    pen.add_aspect(Aspect::Stroke(Stroke::default()));
    pen.add_aspect(Aspect::PathAnalysis(PathAnalysis::new()));
    let pen_id = doc.add_graphic(pen, page, "notes").unwrap();

    let link_id = doc.add_link(rect_id, pen_id, page, "notes").unwrap();
    doc.select_graphic(rect_id, false).unwrap();

    (doc, page, rect_id, child_id, pen_id, link_id)
}

#[test]
fn round_trip_preserves_structure() {
    let (doc, page, rect_id, child_id, pen_id, link_id) = sample_document();
    let json = doc.to_json().unwrap();
    let restored = Document::from_json(&json).unwrap();

    // The rectangle (two aspects + one subgraphic) survives structurally.
    let original = doc.graphic(rect_id).unwrap();
    let decoded = restored.graphic(rect_id).unwrap();
    assert!(decoded.is_equal_to_graphic(original));
    assert_eq!(decoded.subgraphics(), &[child_id]);
    assert_eq!(
        restored.graphic(child_id).unwrap().supergraphic(),
        Some(rect_id)
    );

    // Bucket order and containment are intact; the subgraphic stays out of
    // direct page iteration.
    assert_eq!(
        restored.page(page).unwrap().graphics_for_layer("base"),
        &[rect_id]
    );
    assert_eq!(
        restored.page(page).unwrap().graphics_for_layer("notes"),
        &[pen_id, link_id]
    );

    // Link endpoints and the symmetric related sets resolved.
    match restored.graphic(link_id).unwrap().shape() {
        GraphicShape::Link {
            source,
            destination,
        } => {
            assert_eq!(*source, Some(rect_id));
            assert_eq!(*destination, Some(pen_id));
        }
        other => panic!("expected link, got {other:?}"),
    }
    assert!(
        restored
            .graphic(rect_id)
            .unwrap()
            .related_graphics()
            .contains(&link_id)
    );

    assert!(restored.is_selected(rect_id));
    assert_eq!(restored.layers().len(), 2);
    assert_eq!(restored.active_layer(), doc.active_layer());
}

#[test]
fn derived_aspects_never_reach_the_archive() {
    let (doc, _, _, _, pen_id, _) = sample_document();
    let json = doc.to_json().unwrap();
    assert!(!json.contains("path-analysis"));

    let restored = Document::from_json(&json).unwrap();
    let pen = restored.graphic(pen_id).unwrap();
    assert!(!pen.has_aspect_of_kind(AspectKind::PathAnalysis));
    assert!(pen.has_aspect_of_kind(AspectKind::Stroke));
}

#[test]
fn pen_paths_archive_verbatim_while_frame_shapes_rebuild() {
    let (doc, _, rect_id, _, pen_id, _) = sample_document();
    let archive = doc.to_archive();
    let rect_entry = archive.graphics.iter().find(|g| g.id == rect_id).unwrap();
    let pen_entry = archive.graphics.iter().find(|g| g.id == pen_id).unwrap();
    assert!(rect_entry.path.is_none());
    assert!(pen_entry.path.is_some());

    let restored = Document::from_archive(archive).unwrap();
    let pen = restored.graphic(pen_id).unwrap();
    assert_eq!(
        pen.path().elements(),
        doc.graphic(pen_id).unwrap().path().elements()
    );
}

#[test]
fn newer_versions_are_refused() {
    let (doc, ..) = sample_document();
    let mut archive = doc.to_archive();
    archive.version = ARCHIVE_VERSION + 1;
    assert!(matches!(
        Document::from_archive(archive),
        Err(EaselError::Archive(_))
    ));

    let (doc, ..) = sample_document();
    let mut archive = doc.to_archive();
    archive.version = 0;
    assert!(Document::from_archive(archive).is_err());
}

#[test]
fn dangling_references_are_dropped_not_fatal() {
    let (doc, page, rect_id, ..) = sample_document();
    let mut archive = doc.to_archive();
    let ghost = GraphicId(9999);
    {
        let entry = archive
            .graphics
            .iter_mut()
            .find(|g| g.id == rect_id)
            .unwrap();
        entry.related.push(ghost);
        entry.subgraphics.push(ghost);
    }
    archive.selection.push(ghost);
    archive
        .pages
        .iter_mut()
        .find(|p| p.id == page)
        .unwrap()
        .layers[0]
        .graphics
        .push(ghost);

    let restored = Document::from_archive(archive).unwrap();
    let rect = restored.graphic(rect_id).unwrap();
    assert!(!rect.related_graphics().contains(&ghost));
    assert!(!rect.subgraphics().contains(&ghost));
    assert!(!restored.is_selected(ghost));
    assert!(!restored
        .page(page)
        .unwrap()
        .all_graphics()
        .any(|id| id == ghost));
}

#[test]
fn minimal_archives_decode_with_defaults() {
    let json = r#"{
        "version": 1,
        "layers": [{"name": "ink", "locked": false, "visible": true, "printable": true}],
        "pages": [{"id": 1, "paper_color": {"r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0},
                   "layers": [{"layer": "ink", "graphics": [3]}]}],
        "graphics": [{"id": 3, "shape": "rectangle",
                      "frame": {"x0": 0.0, "y0": 0.0, "x1": 10.0, "y1": 10.0}}]
    }"#;
    let doc = Document::from_json(json).unwrap();
    let graphic = doc.graphic(GraphicId(3)).unwrap();
    assert_eq!(graphic.frame(), Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(graphic.flatness(), 1.0);
    assert!(crate::foundation::geometry::path_contains_point(
        graphic.path(),
        crate::foundation::geometry::WindingRule::NonZero,
        Point::new(5.0, 5.0)
    ));
    assert_eq!(doc.active_layer(), Some("ink"));
    assert_eq!(
        doc.page(PageId(1)).unwrap().graphics_for_layer("ink"),
        &[GraphicId(3)]
    );
}

#[test]
fn malformed_json_is_an_archive_error() {
    assert!(matches!(
        Document::from_json("{not json"),
        Err(EaselError::Archive(_))
    ));
}
