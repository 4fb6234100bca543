//! Paths and clip paths

use std::rc::Rc;

use crate::geometry::{Matrix, Rect};

/// Path segment in object space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// Fill rule for path filling and clipping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn to_skia(self) -> tiny_skia::FillRule {
        match self {
            FillRule::NonZero => tiny_skia::FillRule::Winding,
            FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
        }
    }
}

/// Vector path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed rectangle path
    pub fn rect(rect: &Rect) -> Self {
        let mut path = Self::new();
        path.move_to(rect.left, rect.top);
        path.line_to(rect.right, rect.top);
        path.line_to(rect.right, rect.bottom);
        path.line_to(rect.left, rect.bottom);
        path.close();
        path
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.segments.push(PathSegment::MoveTo(x, y));
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.segments.push(PathSegment::LineTo(x, y));
    }

    pub fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.segments.push(PathSegment::CubicTo(x1, y1, x2, y2, x, y));
    }

    pub fn close(&mut self) {
        self.segments.push(PathSegment::Close);
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Bounds of all points, control points included
    pub fn bounds(&self) -> Rect {
        let mut points = self.segments.iter().flat_map(|seg| match *seg {
            PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => vec![(x, y)],
            PathSegment::CubicTo(x1, y1, x2, y2, x, y) => vec![(x1, y1), (x2, y2), (x, y)],
            PathSegment::Close => Vec::new(),
        });
        let Some((x0, y0)) = points.next() else {
            return Rect::default();
        };
        points.fold(Rect::new(x0, y0, x0, y0), |r, (x, y)| Rect {
            left: r.left.min(x),
            top: r.top.min(y),
            right: r.right.max(x),
            bottom: r.bottom.max(y),
        })
    }

    /// Path mapped through `matrix`
    pub fn transformed(&self, matrix: &Matrix) -> Path {
        let map = |x: f32, y: f32| matrix.transform_point(x, y);
        let segments = self
            .segments
            .iter()
            .map(|seg| match *seg {
                PathSegment::MoveTo(x, y) => {
                    let (x, y) = map(x, y);
                    PathSegment::MoveTo(x, y)
                }
                PathSegment::LineTo(x, y) => {
                    let (x, y) = map(x, y);
                    PathSegment::LineTo(x, y)
                }
                PathSegment::CubicTo(x1, y1, x2, y2, x, y) => {
                    let (x1, y1) = map(x1, y1);
                    let (x2, y2) = map(x2, y2);
                    let (x, y) = map(x, y);
                    PathSegment::CubicTo(x1, y1, x2, y2, x, y)
                }
                PathSegment::Close => PathSegment::Close,
            })
            .collect();
        Path { segments }
    }

    /// Build a tiny-skia path, `None` for degenerate input
    pub fn to_skia(&self) -> Option<tiny_skia::Path> {
        let mut pb = tiny_skia::PathBuilder::new();
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(x, y) => pb.move_to(x, y),
                PathSegment::LineTo(x, y) => pb.line_to(x, y),
                PathSegment::CubicTo(x1, y1, x2, y2, x, y) => pb.cubic_to(x1, y1, x2, y2, x, y),
                PathSegment::Close => pb.close(),
            }
        }
        pb.finish()
    }
}

/// Clip region made of one or more sub-paths, intersected together
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipPathData {
    pub paths: Vec<(Path, FillRule)>,
}

/// Shared clip path; two clips are the same clip only if they share data
#[derive(Debug, Clone)]
pub struct ClipPath(Rc<ClipPathData>);

impl ClipPath {
    pub fn new(paths: Vec<(Path, FillRule)>) -> Self {
        Self(Rc::new(ClipPathData { paths }))
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(vec![(Path::rect(rect), FillRule::NonZero)])
    }

    pub fn paths(&self) -> &[(Path, FillRule)] {
        &self.0.paths
    }

    pub fn is_same(&self, other: &ClipPath) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Intersection of all sub-path bounds
    pub fn bounds(&self) -> Option<Rect> {
        self.0
            .paths
            .iter()
            .map(|(path, _)| path.bounds())
            .reduce(|a, b| a.intersect(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_include_control_points() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.cubic_to(5.0, -5.0, 15.0, 25.0, 10.0, 10.0);
        assert_eq!(path.bounds(), Rect::new(0.0, -5.0, 15.0, 25.0));
    }

    #[test]
    fn test_transformed_path() {
        let path = Path::rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
        let moved = path.transformed(&Matrix::translate(5.0, 5.0));
        assert_eq!(moved.bounds(), Rect::new(5.0, 5.0, 6.0, 6.0));
    }

    #[test]
    fn test_clip_identity() {
        let a = ClipPath::from_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
        let b = a.clone();
        let c = ClipPath::from_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
    }
}
