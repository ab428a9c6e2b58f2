use crate::document::PageBox;
use crate::geometry::{DocRect, ScreenRect};
use crate::layout::Rotation;

/// Orientation of the document's vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YAxis {
    /// Origin at the top of the page; y grows downwards like screen pixels.
    TopDown,
    /// Origin at the bottom of the page; used for native link boxes.
    BottomUp,
}

/// Maps between surface pixels and document units for one placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordConverter {
    placement: ScreenRect,
    axis: YAxis,
    xscale: f64,
    yscale: f64,
}

impl CoordConverter {
    pub fn new(page: &PageBox, placement: ScreenRect, axis: YAxis, rotation: Rotation) -> Self {
        let (width, height) = page.oriented_size(rotation);
        Self {
            placement,
            axis,
            xscale: width / f64::from(placement.width.max(1)),
            yscale: height / f64::from(placement.height.max(1)),
        }
    }

    pub fn to_pdf_x(&self, x: i32) -> f64 {
        f64::from(x - self.placement.x) * self.xscale
    }

    pub fn to_pdf_y(&self, y: i32) -> f64 {
        match self.axis {
            YAxis::TopDown => f64::from(y - self.placement.y) * self.yscale,
            YAxis::BottomUp => {
                f64::from(self.placement.height - (y - self.placement.y)) * self.yscale
            }
        }
    }

    pub fn to_screen_x(&self, x: f64) -> f64 {
        x / self.xscale + f64::from(self.placement.x)
    }

    pub fn to_screen_y(&self, y: f64) -> f64 {
        match self.axis {
            YAxis::TopDown => y / self.yscale + f64::from(self.placement.y),
            YAxis::BottomUp => {
                f64::from(self.placement.y + self.placement.height) - y / self.yscale
            }
        }
    }

    /// Under `BottomUp` the resulting height is negative.
    pub fn to_pdf(&self, r: &ScreenRect) -> DocRect {
        let x = self.to_pdf_x(r.x);
        let y = self.to_pdf_y(r.y);
        DocRect::new(
            x,
            y,
            self.to_pdf_x(r.right()) - x,
            self.to_pdf_y(r.bottom()) - y,
        )
    }

    pub fn to_screen(&self, r: &DocRect) -> ScreenRect {
        let x = self.to_screen_x(r.x);
        let y = self.to_screen_y(r.y);
        ScreenRect::new(
            x as i32,
            y as i32,
            (self.to_screen_x(r.right()) - x) as i32,
            (self.to_screen_y(r.bottom()) - y) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn converter(axis: YAxis) -> CoordConverter {
        CoordConverter::new(
            &PageBox::new(300.0, 400.0),
            ScreenRect::new(100, 50, 600, 800),
            axis,
            Rotation::Deg0,
        )
    }

    #[test]
    fn top_down_maps_placement_origin_to_page_origin() {
        let cc = converter(YAxis::TopDown);
        assert_eq!(cc.to_pdf_x(100), 0.0);
        assert_eq!(cc.to_pdf_y(50), 0.0);
        assert_eq!(cc.to_pdf_x(700), 300.0);
        assert_eq!(cc.to_pdf_y(850), 400.0);
    }

    #[test]
    fn bottom_up_inverts_vertical_axis() {
        let cc = converter(YAxis::BottomUp);
        assert_eq!(cc.to_pdf_y(50), 400.0);
        assert_eq!(cc.to_pdf_y(850), 0.0);
        assert_eq!(cc.to_screen_y(400.0), 50.0);
    }

    #[test]
    fn rect_round_trip_top_down() {
        let cc = converter(YAxis::TopDown);
        let screen = ScreenRect::new(120, 90, 200, 100);
        let doc = cc.to_pdf(&screen);
        assert_eq!(doc, DocRect::new(10.0, 20.0, 100.0, 50.0));
        assert_eq!(cc.to_screen(&doc), screen);
    }

    #[test]
    fn link_box_projects_to_screen() {
        let cc = converter(YAxis::BottomUp);
        // Native link box: 50 units tall, top edge at y = 400 - 20.
        let link = DocRect::new(10.0, 380.0, 100.0, -50.0);
        assert_eq!(cc.to_screen(&link), ScreenRect::new(120, 90, 200, 100));
    }

    #[test]
    fn quarter_turn_swaps_scales() {
        let cc = CoordConverter::new(
            &PageBox::new(300.0, 400.0),
            ScreenRect::new(0, 0, 800, 600),
            YAxis::TopDown,
            Rotation::Deg90,
        );
        assert_eq!(cc.to_pdf_x(800), 400.0);
        assert_eq!(cc.to_pdf_y(600), 300.0);
    }

    #[test]
    fn zero_sized_placement_stays_finite() {
        let cc = CoordConverter::new(
            &PageBox::new(300.0, 400.0),
            ScreenRect::new(0, 0, 0, 0),
            YAxis::TopDown,
            Rotation::Deg0,
        );
        assert!(cc.to_pdf_x(10).is_finite());
        assert!(cc.to_screen_y(10.0).is_finite());
    }

    fn axis() -> impl Strategy<Value = YAxis> {
        prop_oneof![Just(YAxis::TopDown), Just(YAxis::BottomUp)]
    }

    fn rotation() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Deg0),
            Just(Rotation::Deg90),
            Just(Rotation::Deg180),
            Just(Rotation::Deg270),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_screen_pdf_round_trip(
            px in -2000i32..2000,
            py in -2000i32..2000,
            ox in -500i32..500,
            oy in -2000i32..500,
            w in 1i32..3000,
            h in 1i32..3000,
            pw in 10.0f64..2000.0,
            ph in 10.0f64..2000.0,
            axis in axis(),
            rotation in rotation(),
        ) {
            let cc = CoordConverter::new(
                &PageBox::new(pw, ph),
                ScreenRect::new(ox, oy, w, h),
                axis,
                rotation,
            );
            let sx = cc.to_screen_x(cc.to_pdf_x(px)) as i32;
            let sy = cc.to_screen_y(cc.to_pdf_y(py)) as i32;
            prop_assert!((sx - px).abs() <= 1);
            prop_assert!((sy - py).abs() <= 1);

            let (shown_w, _) = PageBox::new(pw, ph).oriented_size(rotation);
            prop_assert!((cc.to_pdf_x(ox + w) - shown_w).abs() < 1e-6);
        }
    }
}
