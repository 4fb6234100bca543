//! Progressive rendering tests for folio-render
//!
//! Drives whole render requests through the recording device and checks
//! pause points, resumption order and stop objects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use folio_render::*;

fn square(x: f32, y: f32, color: Color) -> PageObject {
    PageObject::new(ObjectKind::Path(PathObject::rect(&Rect::new(x, y, x + 4.0, y + 4.0))))
        .with_fill_color(color)
}

/// Object `i` is painted with a color encoding `i`
fn numbered(i: u32) -> PageObject {
    square((i % 20) as f32 * 5.0, (i / 20) as f32 * 5.0, Color::from_argb(0xff00_0000 | i))
}

fn painted_ids(device: &DisplayListDevice) -> Vec<u32> {
    device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::DrawPath { fill: Some(color), .. } => Some(color.to_argb() & 0x00ff_ffff),
            _ => None,
        })
        .collect()
}

fn run_to_end(
    renderer: &mut ProgressiveRenderer<'_, '_>,
    pause: Option<&dyn PauseIndicator>,
) -> usize {
    let mut rounds = 0;
    while renderer.status() == RenderState::ToBeContinued {
        renderer.continue_render(pause);
        rounds += 1;
        assert!(rounds < 1000, "renderer never finished");
    }
    rounds
}

/// Holder that reveals its objects a few at a time
struct ChunkedHolder {
    objects: Vec<PageObject>,
    revealed: usize,
    chunk: usize,
    parse_calls: usize,
}

impl ChunkedHolder {
    fn new(objects: Vec<PageObject>, chunk: usize) -> Self {
        Self { objects, revealed: 0, chunk, parse_calls: 0 }
    }
}

impl PageObjectHolder for ChunkedHolder {
    fn objects(&self) -> &[PageObject] {
        &self.objects[..self.revealed]
    }

    fn parse_state(&self) -> ParseState {
        if self.revealed == self.objects.len() {
            ParseState::Parsed
        } else if self.revealed == 0 {
            ParseState::NotParsed
        } else {
            ParseState::Parsing
        }
    }

    fn continue_parse(&mut self, _pause: Option<&dyn PauseIndicator>) {
        self.parse_calls += 1;
        self.revealed = (self.revealed + self.chunk).min(self.objects.len());
    }
}

// ============================================================================
// STATE TRANSITIONS
// ============================================================================

#[test]
fn test_ready_until_started() {
    let page = RefCell::new(ObjectList::new());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
    renderer.continue_render(None);
    assert_eq!(renderer.status(), RenderState::Ready);

    renderer.start(None);
    assert_eq!(renderer.status(), RenderState::Done);

    // Done is terminal
    renderer.start(None);
    renderer.continue_render(None);
    assert_eq!(renderer.status(), RenderState::Done);
}

#[test]
fn test_failed_start_is_terminal() {
    let options = RenderOptions::default();
    let mut renderer = ProgressiveRenderer::new(None, None, &options);
    renderer.start(Some(&NeverPause));
    assert_eq!(renderer.status(), RenderState::Failed);
    renderer.continue_render(Some(&NeverPause));
    assert_eq!(renderer.status(), RenderState::Failed);
}

#[test]
fn test_no_pause_renders_in_one_call() {
    let page = RefCell::new((0..250).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
        assert_eq!(renderer.status(), RenderState::Done);
    }
    assert_eq!(painted_ids(&device), (0..250).collect::<Vec<_>>());
}

// ============================================================================
// PAUSE POINTS
// ============================================================================

#[test]
fn test_pause_at_second_checkpoint() {
    let page = RefCell::new((0..250).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    // Declines the first checkpoint, accepts every later one
    let checks = Cell::new(0);
    let pause = || {
        checks.set(checks.get() + 1);
        checks.get() > 1
    };

    let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
    renderer.start(Some(&pause));
    assert_eq!(renderer.status(), RenderState::ToBeContinued);
    assert_eq!(checks.get(), 2);

    // Remaining 50 objects, then the layer boundary pause
    renderer.continue_render(Some(&pause));
    assert_eq!(renderer.status(), RenderState::ToBeContinued);
    assert_eq!(renderer.layer_index(), 1);

    renderer.continue_render(Some(&pause));
    assert_eq!(renderer.status(), RenderState::Done);
    drop(renderer);

    assert_eq!(painted_ids(&device), (0..250).collect::<Vec<_>>());
    assert_eq!(device.depth(), 0);
}

#[test]
fn test_every_object_rendered_once_across_resumes() {
    let page = RefCell::new((0..250).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);
    let pause = || true;

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(Some(&pause));
        let rounds = run_to_end(&mut renderer, Some(&pause));
        // 100 + 100 + 50, then the layer boundary
        assert_eq!(rounds, 3);
    }
    assert_eq!(painted_ids(&device), (0..250).collect::<Vec<_>>());
}

#[test]
fn test_form_ends_step_batch() {
    let inner: ObjectList = [square(0.0, 0.0, Color::BLACK)].into_iter().collect();
    let objects: ObjectList = [
        square(0.0, 0.0, Color::BLACK),
        PageObject::new(ObjectKind::Form(FormObject::new(inner, Matrix::identity()))),
        square(10.0, 0.0, Color::BLACK),
    ]
    .into_iter()
    .collect();
    let page = RefCell::new(objects);
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    let checks = Cell::new(0);
    let pause = || {
        checks.set(checks.get() + 1);
        true
    };
    let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
    renderer.start(Some(&pause));
    assert_eq!(renderer.status(), RenderState::ToBeContinued);
    assert_eq!(checks.get(), 1);
    drop(renderer);

    // The plain square plus the form's content
    assert_eq!(device.paint_commands().count(), 2);
}

#[test]
fn test_deadline_pause_slices_render() {
    let page = RefCell::new((0..250).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);
    let pause = DeadlinePause::new(std::time::Duration::ZERO);
    std::thread::sleep(std::time::Duration::from_micros(10));

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(Some(&pause));
        assert_eq!(renderer.status(), RenderState::ToBeContinued);
        run_to_end(&mut renderer, Some(&pause));
        assert_eq!(renderer.status(), RenderState::Done);
    }
    assert_eq!(painted_ids(&device).len(), 250);
}

// ============================================================================
// LAYERS AND STOP OBJECTS
// ============================================================================

#[test]
fn test_layer_matrices_apply() {
    let first = RefCell::new([square(0.0, 0.0, Color::BLACK)].into_iter().collect::<ObjectList>());
    let second = RefCell::new([square(0.0, 0.0, Color::BLACK)].into_iter().collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&first, Matrix::identity());
    context.append_layer(&second, Matrix::translate(30.0, 40.0));
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
        assert_eq!(renderer.status(), RenderState::Done);
    }
    let bounds: Vec<Rect> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::DrawPath { bounds, .. } => Some(*bounds),
            _ => None,
        })
        .collect();
    assert_eq!(bounds, vec![Rect::new(0.0, 0.0, 4.0, 4.0), Rect::new(30.0, 40.0, 34.0, 44.0)]);
}

#[test]
fn test_stop_object_in_middle_layer() {
    let first = RefCell::new((0..3).map(numbered).collect::<ObjectList>());
    let second = RefCell::new((10..14).map(numbered).collect::<ObjectList>());
    let third = RefCell::new((20..23).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&first, Matrix::identity());
    context.append_layer(&second, Matrix::identity());
    context.append_layer(&third, Matrix::identity());

    let mut device = DisplayListDevice::new(100, 100);
    let holder = second.borrow();
    let stop = &holder.objects()[2];
    context.render(&mut device, Some(stop), &RenderOptions::default(), None);

    assert_eq!(painted_ids(&device), vec![0, 1, 2, 10, 11]);
    assert_eq!(device.depth(), 0);
}

#[test]
fn test_stop_object_not_in_context_renders_all() {
    let page = RefCell::new((0..3).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());

    let elsewhere = numbered(0);
    let mut device = DisplayListDevice::new(100, 100);
    context.render(&mut device, Some(&elsewhere), &RenderOptions::default(), None);
    assert_eq!(painted_ids(&device), vec![0, 1, 2]);
}

#[test]
fn test_hidden_content_group_skipped() {
    let objects: ObjectList = [
        numbered(1),
        numbered(2).with_content_group("watermark"),
        numbered(3),
    ]
    .into_iter()
    .collect();
    let page = RefCell::new(objects);
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default().hide_content_group("watermark");
    let mut device = DisplayListDevice::new(100, 100);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
    }
    assert_eq!(painted_ids(&device), vec![1, 3]);
}

// ============================================================================
// INCREMENTAL PARSING
// ============================================================================

#[test]
fn test_incremental_holder_is_rendered_as_it_parses() {
    let page = RefCell::new(ChunkedHolder::new((0..7).map(numbered).collect(), 3));
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
        // Nothing parsed yet; one chunk was requested
        assert_eq!(renderer.status(), RenderState::ToBeContinued);
        run_to_end(&mut renderer, None);
        assert_eq!(renderer.status(), RenderState::Done);
    }
    assert_eq!(painted_ids(&device), (0..7).collect::<Vec<_>>());
    assert_eq!(page.borrow().parse_calls, 3);
    assert_eq!(device.depth(), 0);
}

#[test]
fn test_incremental_holder_cursor_survives_parse() {
    let page = RefCell::new(ChunkedHolder::new((0..7).map(numbered).collect(), 2));
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100);

    let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
    renderer.start(None);
    renderer.continue_render(None);
    renderer.continue_render(None);
    assert_eq!(renderer.status(), RenderState::ToBeContinued);
    drop(renderer);
    // Two chunks drawn, the third parsed but not yet drawn
    assert_eq!(painted_ids(&device), vec![0, 1, 2, 3]);
    assert_eq!(page.borrow().objects().len(), 6);
}

// ============================================================================
// IMAGE MASKS
// ============================================================================

fn mask_page() -> RefCell<ObjectList> {
    let coverage = Dib::from_gray(2, 2, vec![255; 4]).unwrap();
    let mask: Rc<dyn ImageResource> = Rc::new(RawImage::stencil(ImageId(9), coverage));
    let image = ImageObject::new(mask, Matrix::new(10.0, 0.0, 0.0, 10.0, 20.0, 20.0));
    RefCell::new(
        [
            numbered(1),
            PageObject::new(ObjectKind::Image(image)).with_fill_color(Color::rgb(255, 0, 0)),
            numbered(2),
        ]
        .into_iter()
        .collect(),
    )
}

#[test]
fn test_printer_suspends_at_image_mask() {
    let page = mask_page();
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default().with_break_for_masks(true);
    let mut device = DisplayListDevice::new(100, 100).with_class(DeviceClass::Printer);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
        assert_eq!(renderer.status(), RenderState::ToBeContinued);
        renderer.continue_render(None);
        assert_eq!(renderer.status(), RenderState::Done);
    }
    // The mask itself is left to the print path
    assert_eq!(painted_ids(&device), vec![1, 2]);
    assert!(!device.commands().iter().any(|c| matches!(c, DrawCommand::DrawBitmap { .. })));
}

#[test]
fn test_display_draws_mask_then_suspends() {
    let page = mask_page();
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default().with_break_for_masks(true);
    let mut device = DisplayListDevice::new(100, 100);

    let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
    renderer.start(None);
    assert_eq!(renderer.status(), RenderState::ToBeContinued);
    renderer.continue_render(None);
    assert_eq!(renderer.status(), RenderState::Done);
    drop(renderer);

    assert_eq!(painted_ids(&device), vec![1, 2]);
    let bitmaps = device
        .commands()
        .iter()
        .filter(|c| matches!(c, DrawCommand::DrawBitmap { width: 2, height: 2, .. }))
        .count();
    assert_eq!(bitmaps, 1);
}

#[test]
fn test_masks_ignored_without_break_option() {
    let page = mask_page();
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();
    let mut device = DisplayListDevice::new(100, 100).with_class(DeviceClass::Printer);

    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut device), &options);
        renderer.start(None);
        assert_eq!(renderer.status(), RenderState::Done);
    }
    assert_eq!(device.paint_commands().count(), 3);
}

// ============================================================================
// RASTER OUTPUT
// ============================================================================

#[test]
fn test_progressive_matches_one_shot_pixels() {
    let page = RefCell::new((0..250).map(numbered).collect::<ObjectList>());
    let mut context = RenderContext::new();
    context.append_layer(&page, Matrix::identity());
    let options = RenderOptions::default();

    let mut one_shot = PixmapDevice::new(100, 100).unwrap();
    context.render(&mut one_shot, None, &options, None);

    let mut sliced = PixmapDevice::new(100, 100).unwrap();
    let pause = || true;
    {
        let mut renderer = ProgressiveRenderer::new(Some(&context), Some(&mut sliced), &options);
        renderer.start(Some(&pause));
        run_to_end(&mut renderer, Some(&pause));
    }
    assert_eq!(one_shot.pixmap().data(), sliced.pixmap().data());
}
