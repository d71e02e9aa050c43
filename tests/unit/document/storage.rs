use super::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::aspect::Aspect;
use crate::aspect::fill::Fill;
use crate::aspect::stroke::Stroke;
use crate::render::canvas::{CanvasOp, RecordingCanvas};
use crate::scene::graphic::{AutosizeMask, PointerEvent};
use crate::scene::handle::Handle;

fn doc_with_page() -> (Document, PageId) {
    let mut doc = Document::new();
    let page = doc.add_page();
    doc.add_layer("ink").unwrap();
    (doc, page)
}

fn rect_graphic(x0: f64, y0: f64, x1: f64, y1: f64) -> Graphic {
    Graphic::new(GraphicShape::Rectangle, Rect::new(x0, y0, x1, y1))
}

fn filled_rect(x0: f64, y0: f64, x1: f64, y1: f64, color: Color) -> Graphic {
    let mut graphic = rect_graphic(x0, y0, x1, y1);
    graphic.add_aspect(Aspect::Fill(Fill::new(color)));
    graphic
}

fn red() -> Color {
    Color::rgba(1.0, 0.0, 0.0, 1.0)
}

fn blue() -> Color {
    Color::rgba(0.0, 0.0, 1.0, 1.0)
}

#[test]
fn added_graphics_land_on_top_of_their_layer() {
    let (mut doc, page) = doc_with_page();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let b = doc
        .add_graphic(filled_rect(5.0, 5.0, 15.0, 15.0, blue()), page, "ink")
        .unwrap();
    assert_eq!(doc.page(page).unwrap().graphics_for_layer("ink"), &[a, b]);
    assert_eq!(doc.graphic(a).unwrap().layer(), Some("ink"));
    assert_eq!(doc.graphic(a).unwrap().page(), Some(page));
}

#[test]
fn adding_to_unknown_page_or_layer_is_a_structure_error() {
    let (mut doc, page) = doc_with_page();
    let err = doc
        .add_graphic(rect_graphic(0.0, 0.0, 1.0, 1.0), PageId(99), "ink")
        .unwrap_err();
    assert!(matches!(err, EaselError::Structure(_)));
    let err = doc
        .add_graphic(rect_graphic(0.0, 0.0, 1.0, 1.0), page, "nope")
        .unwrap_err();
    assert!(matches!(err, EaselError::Structure(_)));
}

#[test]
fn locked_layers_accept_graphics_but_gate_editing() {
    let (mut doc, page) = doc_with_page();
    doc.add_layer("Background").unwrap();
    doc.add_layer("Foreground").unwrap();
    doc.set_layer_locked("Background", true).unwrap();

    let id = doc
        .add_graphic(
            filled_rect(0.0, 0.0, 10.0, 10.0, red()),
            page,
            "Background",
        )
        .unwrap();
    assert!(doc.page(page).unwrap().contains_graphic("Background", id));
    assert!(doc.layer_is_locked_or_not_visible(id));

    let fg = doc
        .add_graphic(
            filled_rect(0.0, 0.0, 10.0, 10.0, red()),
            page,
            "Foreground",
        )
        .unwrap();
    assert!(!doc.layer_is_locked_or_not_visible(fg));
}

#[test]
fn removing_a_related_graphic_severs_the_back_reference() {
    let (mut doc, page) = doc_with_page();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let b = doc
        .add_graphic(filled_rect(20.0, 0.0, 30.0, 10.0, blue()), page, "ink")
        .unwrap();
    doc.relate_graphics(a, b).unwrap();
    assert!(doc.graphic(a).unwrap().related_graphics().contains(&b));

    doc.remove_graphic(b).unwrap();
    assert!(doc.graphic(a).unwrap().related_graphics().is_empty());
}

#[test]
fn links_attach_at_shape_edges_and_follow_moves() {
    let (mut doc, page) = doc_with_page();
    let src = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let dst = doc
        .add_graphic(filled_rect(30.0, 0.0, 40.0, 10.0, blue()), page, "ink")
        .unwrap();
    let link = doc.add_link(src, dst, page, "ink").unwrap();

    let path = doc.graphic(link).unwrap().path();
    let bounds = path.bounding_box();
    assert!((bounds.x0 - 10.0).abs() < 1e-6);
    assert!((bounds.x1 - 30.0).abs() < 1e-6);
    assert!((bounds.y0 - 5.0).abs() < 1e-6);

    // Moving an endpoint reroutes the connector.
    doc.move_graphic_by(dst, Vec2::new(10.0, 0.0)).unwrap();
    let bounds = doc.graphic(link).unwrap().path().bounding_box();
    assert!((bounds.x1 - 40.0).abs() < 1e-6);
}

#[test]
fn removing_an_endpoint_clears_the_link_without_dangling_ids() {
    let (mut doc, page) = doc_with_page();
    let src = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let dst = doc
        .add_graphic(filled_rect(30.0, 0.0, 40.0, 10.0, blue()), page, "ink")
        .unwrap();
    let link = doc.add_link(src, dst, page, "ink").unwrap();

    doc.remove_graphic(dst).unwrap();
    let graphic = doc.graphic(link).unwrap();
    match graphic.shape() {
        GraphicShape::Link {
            source,
            destination,
        } => {
            assert_eq!(*source, Some(src));
            assert_eq!(*destination, None);
        }
        other => panic!("expected a link, got {other:?}"),
    }
    assert!(!graphic.related_graphics().contains(&dst));
}

#[test]
fn undo_and_redo_replay_an_add() {
    let (mut doc, page) = doc_with_page();
    let id = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    assert!(doc.can_undo());

    assert!(doc.undo());
    assert!(doc.graphic(id).is_none());
    assert!(doc.page(page).unwrap().graphics_for_layer("ink").is_empty());

    assert!(doc.redo());
    assert!(doc.graphic(id).is_some());
    assert_eq!(doc.page(page).unwrap().graphics_for_layer("ink"), &[id]);
}

#[test]
fn undoing_a_removal_restores_the_graphic_in_place() {
    let (mut doc, page) = doc_with_page();
    let bottom = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let mut middle_graphic = filled_rect(5.0, 5.0, 15.0, 15.0, blue());
    middle_graphic.add_aspect(Aspect::Stroke(Stroke::with_width(4.0)));
    let middle = doc.add_graphic(middle_graphic, page, "ink").unwrap();
    let top = doc
        .add_graphic(filled_rect(8.0, 8.0, 18.0, 18.0, red()), page, "ink")
        .unwrap();
    doc.select_graphic(middle, false).unwrap();

    let snapshot = doc.graphic(middle).unwrap().clone();
    doc.remove_graphic(middle).unwrap();
    assert!(doc.graphic(middle).is_none());
    assert!(!doc.is_selected(middle));

    assert!(doc.undo());
    let restored = doc.graphic(middle).unwrap();
    assert!(restored.is_equal_to_graphic(&snapshot));
    assert_eq!(
        doc.page(page).unwrap().graphics_for_layer("ink"),
        &[bottom, middle, top]
    );
    assert!(doc.is_selected(middle));
}

#[test]
fn frame_changes_are_undoable_and_dirty_the_page() {
    let (mut doc, page) = doc_with_page();
    let id = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    doc.page_mut(page).unwrap().take_update_rect();

    doc.set_graphic_frame(id, Rect::new(50.0, 50.0, 80.0, 90.0))
        .unwrap();
    assert_eq!(doc.graphic(id).unwrap().frame(), Rect::new(50.0, 50.0, 80.0, 90.0));

    // Both the old and the new position need repainting.
    let dirty = doc.page(page).unwrap().update_rect().unwrap();
    assert!(dirty.x0 <= 0.0 && dirty.x1 >= 80.0);

    assert!(doc.undo());
    assert_eq!(doc.graphic(id).unwrap().frame(), Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(doc.redo());
    assert_eq!(doc.graphic(id).unwrap().frame(), Rect::new(50.0, 50.0, 80.0, 90.0));
}

#[test]
fn batched_edits_fire_one_consolidated_notification() {
    let (mut doc, page) = doc_with_page();
    let removals: Vec<GraphicId> = (0..3)
        .map(|i| {
            doc.add_graphic(
                filled_rect(0.0, 0.0, 10.0 + f64::from(i), 10.0, red()),
                page,
                "ink",
            )
            .unwrap()
        })
        .collect();

    let deliveries: Rc<RefCell<Vec<Vec<Change>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = deliveries.clone();
    doc.add_observer(Box::new(move |changes| {
        sink.borrow_mut().push(changes.to_vec());
    }));

    doc.batch_edits(|doc| {
        for id in &removals {
            doc.remove_graphic(*id).unwrap();
        }
        doc.add_graphic(filled_rect(0.0, 0.0, 5.0, 5.0, blue()), page, "ink")
            .unwrap();
        doc.add_graphic(filled_rect(5.0, 0.0, 9.0, 5.0, blue()), page, "ink")
            .unwrap();
    });

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1, "exactly one consolidated notification");
    let graphic_changes: Vec<&Change> = deliveries[0]
        .iter()
        .filter(|c| {
            matches!(
                c,
                Change::GraphicAdded(_) | Change::GraphicRemoved(_) | Change::GraphicChanged(_)
            )
        })
        .collect();
    assert_eq!(graphic_changes.len(), 5, "net effect enumerates 3 removes + 2 adds");
    assert_eq!(
        graphic_changes
            .iter()
            .filter(|c| matches!(c, Change::GraphicRemoved(_)))
            .count(),
        3
    );
    assert_eq!(
        graphic_changes
            .iter()
            .filter(|c| matches!(c, Change::GraphicAdded(_)))
            .count(),
        2
    );
}

#[test]
fn selection_tracks_membership() {
    let (mut doc, page) = doc_with_page();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let b = doc
        .add_graphic(filled_rect(20.0, 0.0, 30.0, 10.0, blue()), page, "ink")
        .unwrap();

    doc.select_graphic(a, false).unwrap();
    doc.select_graphic(b, true).unwrap();
    assert_eq!(doc.selection().len(), 2);

    doc.select_graphic(b, false).unwrap();
    assert_eq!(doc.selection().len(), 1);
    assert!(doc.is_selected(b));

    doc.clear_selection();
    assert!(doc.selection().is_empty());
    assert!(doc.select_graphic(GraphicId(999), false).is_err());
}

#[test]
fn layer_names_are_unique_and_renames_re_key() {
    let (mut doc, page) = doc_with_page();
    assert!(doc.add_layer("ink").is_err());

    let id = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    doc.rename_layer("ink", "outlines").unwrap();
    assert!(doc.layer("ink").is_none());
    assert_eq!(doc.page(page).unwrap().graphics_for_layer("outlines"), &[id]);
    assert_eq!(doc.graphic(id).unwrap().layer(), Some("outlines"));

    assert!(doc.undo());
    assert_eq!(doc.page(page).unwrap().graphics_for_layer("ink"), &[id]);
    assert_eq!(doc.graphic(id).unwrap().layer(), Some("ink"));
}

#[test]
fn populated_layers_refuse_removal() {
    let (mut doc, page) = doc_with_page();
    doc.add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    assert!(matches!(
        doc.remove_layer("ink"),
        Err(EaselError::Structure(_))
    ));

    doc.add_layer("scratch").unwrap();
    assert!(doc.remove_layer("scratch").is_ok());
    assert!(doc.undo());
    assert!(doc.layer("scratch").is_some());
}

#[test]
fn hiding_a_layer_skips_it_during_drawing() {
    let (mut doc, page) = doc_with_page();
    doc.add_layer("notes").unwrap();
    doc.add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    doc.add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, blue()), page, "notes")
        .unwrap();
    doc.set_layer_visible("notes", false).unwrap();

    let mut canvas = RecordingCanvas::new();
    doc.draw_page(page, &mut canvas, &DrawOptions::default())
        .unwrap();
    let colors: Vec<Color> = canvas
        .ops()
        .iter()
        .filter_map(|op| match op {
            CanvasOp::FillPath { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    // Paper, then the visible layer's fill; the hidden layer is a no-op.
    assert_eq!(colors, vec![Color::WHITE, red()]);
}

#[test]
fn printing_suppresses_screen_only_furniture() {
    let (mut doc, page) = doc_with_page();
    doc.add_layer("proofs").unwrap();
    doc.set_layer_printable("proofs", false).unwrap();
    doc.add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "proofs")
        .unwrap();
    // A graphic with no renderable aspect would normally ghost on screen.
    doc.add_graphic(rect_graphic(20.0, 20.0, 30.0, 30.0), page, "ink")
        .unwrap();
    doc.settings.grid_visible = true;
    doc.settings.grid_spacing = 100.0;
    doc.page_mut(page)
        .unwrap()
        .add_guest_drawer(Box::new(|canvas, _| canvas.push_opacity(0.5)));

    let mut screen = RecordingCanvas::new();
    doc.draw_page(page, &mut screen, &DrawOptions::default())
        .unwrap();
    assert!(screen.ops().iter().any(|op| matches!(op, CanvasOp::PushOpacity(_))));
    // Paper + grid + ghost.
    assert!(screen.ops().len() >= 3);

    let mut print = RecordingCanvas::new();
    doc.draw_page(
        page,
        &mut print,
        &DrawOptions {
            printing: true,
            dirty_rect: None,
        },
    )
    .unwrap();
    // Only the paper fill survives: no grid, no ghost, no guest overlay,
    // and the non-printable layer is skipped.
    assert_eq!(print.ops().len(), 1);
    assert!(matches!(
        print.ops()[0],
        CanvasOp::FillPath { color, .. } if color == Color::WHITE
    ));
}

#[test]
fn invisible_graphics_get_a_ghost_rendition_on_screen() {
    let (mut doc, page) = doc_with_page();
    doc.add_graphic(rect_graphic(0.0, 0.0, 10.0, 10.0), page, "ink")
        .unwrap();
    let mut canvas = RecordingCanvas::new();
    doc.draw_page(page, &mut canvas, &DrawOptions::default())
        .unwrap();
    assert!(canvas.ops().iter().any(|op| matches!(
        op,
        CanvasOp::FillPath { color, .. } if *color == Color::GHOST_GRAY
    )));
}

#[test]
fn hits_come_back_topmost_first_across_layers() {
    let (mut doc, page) = doc_with_page();
    doc.add_layer("overlay").unwrap();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 100.0, 100.0, red()), page, "ink")
        .unwrap();
    let b = doc
        .add_graphic(filled_rect(0.0, 0.0, 100.0, 100.0, blue()), page, "overlay")
        .unwrap();
    let c = doc
        .add_graphic(filled_rect(0.0, 0.0, 100.0, 100.0, red()), page, "overlay")
        .unwrap();

    let hits = doc.graphics_hit_by_point(page, Point::new(50.0, 50.0));
    assert_eq!(hits, vec![c, b, a]);

    // Hidden layers are not hittable.
    doc.set_layer_visible("overlay", false).unwrap();
    let hits = doc.graphics_hit_by_point(page, Point::new(50.0, 50.0));
    assert_eq!(hits, vec![a]);
}

#[test]
fn rubber_band_hits_use_rect_intersection() {
    let (mut doc, page) = doc_with_page();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let _far = doc
        .add_graphic(filled_rect(200.0, 200.0, 210.0, 210.0, blue()), page, "ink")
        .unwrap();
    let hits = doc.graphics_hit_by_rect(page, Rect::new(-5.0, -5.0, 5.0, 5.0));
    assert_eq!(hits, vec![a]);
}

#[test]
fn subgraphics_leave_direct_page_iteration_and_draw_in_the_children_band() {
    let (mut doc, page) = doc_with_page();
    let mut parent_graphic = filled_rect(0.0, 0.0, 100.0, 100.0, red());
    parent_graphic.add_aspect(Aspect::Stroke(Stroke::with_width(2.0)));
    let parent = doc.add_graphic(parent_graphic, page, "ink").unwrap();
    let child = doc
        .add_graphic(filled_rect(10.0, 10.0, 20.0, 20.0, blue()), page, "ink")
        .unwrap();

    doc.add_subgraphic(parent, child).unwrap();
    assert_eq!(doc.page(page).unwrap().graphics_for_layer("ink"), &[parent]);
    assert_eq!(doc.graphic(child).unwrap().supergraphic(), Some(parent));
    assert_eq!(doc.graphic(child).unwrap().page(), None);

    let mut canvas = RecordingCanvas::new();
    doc.draw_page(page, &mut canvas, &DrawOptions::default())
        .unwrap();
    let colors: Vec<Color> = canvas
        .ops()
        .iter()
        .filter_map(|op| match op {
            CanvasOp::FillPath { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    // Paper, parent fill, child (children band), parent stroke on top.
    assert_eq!(colors, vec![Color::WHITE, red(), blue(), Color::BLACK]);

    // Children are still hittable, before their parent.
    let hits = doc.graphics_hit_by_point(page, Point::new(15.0, 15.0));
    assert_eq!(hits, vec![child, parent]);
}

#[test]
fn containment_cycles_are_rejected() {
    let (mut doc, page) = doc_with_page();
    let a = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
        .unwrap();
    let b = doc
        .add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, blue()), page, "ink")
        .unwrap();
    doc.add_subgraphic(a, b).unwrap();
    assert!(matches!(
        doc.add_subgraphic(b, a),
        Err(EaselError::Structure(_))
    ));
    assert!(matches!(
        doc.add_subgraphic(a, a),
        Err(EaselError::Structure(_))
    ));
}

#[test]
fn autosized_children_follow_their_parent_through_the_document() {
    let (mut doc, page) = doc_with_page();
    let mut parent_graphic = filled_rect(0.0, 0.0, 40.0, 40.0, red());
    parent_graphic.set_autosize_subgraphics(true);
    let parent = doc.add_graphic(parent_graphic, page, "ink").unwrap();
    let child = doc
        .add_graphic(filled_rect(10.0, 0.0, 30.0, 10.0, blue()), page, "ink")
        .unwrap();
    doc.add_subgraphic(parent, child).unwrap();
    doc.graphic_mut(child)
        .unwrap()
        .set_autoresizing_mask(AutosizeMask::WIDTH);

    doc.set_graphic_frame(parent, Rect::new(0.0, 0.0, 80.0, 40.0))
        .unwrap();
    assert_eq!(
        doc.graphic(child).unwrap().frame(),
        Rect::new(10.0, 0.0, 70.0, 10.0)
    );
}

#[test]
fn group_focus_enters_and_exits() {
    let (mut doc, page) = doc_with_page();
    let group = doc
        .add_graphic(filled_rect(0.0, 0.0, 50.0, 50.0, red()), page, "ink")
        .unwrap();
    assert!(doc.enter_group(GraphicId(999)).is_err());
    doc.enter_group(group).unwrap();
    assert_eq!(doc.focused_group(), Some(group));
    doc.exit_group();
    assert_eq!(doc.focused_group(), None);
}

#[test]
fn finish_tracking_registers_one_undo_for_the_gesture() {
    let (mut doc, page) = doc_with_page();
    let id = doc
        .add_graphic(filled_rect(0.0, 0.0, 100.0, 100.0, red()), page, "ink")
        .unwrap();

    let graphic = doc.graphic_mut(id).unwrap();
    assert!(graphic.track_mouse(&PointerEvent::at(Point::new(100.0, 100.0))));
    assert_eq!(graphic.tracked_handle(), Some(Handle::BottomRight));
    graphic.continue_tracking(Point::new(150.0, 120.0));
    doc.finish_tracking(id, Point::new(150.0, 120.0)).unwrap();

    assert_eq!(
        doc.graphic(id).unwrap().frame(),
        Rect::new(0.0, 0.0, 150.0, 120.0)
    );
    assert!(doc.undo());
    assert_eq!(
        doc.graphic(id).unwrap().frame(),
        Rect::new(0.0, 0.0, 100.0, 100.0)
    );
}

#[test]
fn with_undo_disabled_records_nothing() {
    let (mut doc, page) = doc_with_page();
    doc.with_undo_disabled(|doc| {
        doc.add_graphic(filled_rect(0.0, 0.0, 10.0, 10.0, red()), page, "ink")
            .unwrap();
    });
    // The disabled add left no group; the layer creation is still on top.
    assert_eq!(doc.undo_name(), Some("Add Layer"));
    assert_eq!(doc.arena().len(), 1);
}
