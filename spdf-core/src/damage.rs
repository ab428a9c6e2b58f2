use crate::geometry::{intersect, subtract, ScreenPoint, ScreenRect};
use crate::surface::{DrawOp, Paint};

/// The status bar as it should appear on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine<'a> {
    pub bar: ScreenRect,
    pub text: &'a str,
    /// Descent of the surface font.
    pub descent: i32,
}

/// Draw operations that bring `damage` up to date after the page moved from
/// `previous` to `current`.
///
/// Output order is clear, blit, highlight, status. The blit source is
/// relative to the page bitmap, whose origin sits at `current.x/y`.
pub fn plan_repaint(
    previous: ScreenRect,
    current: ScreenRect,
    damage: ScreenRect,
    highlight: Option<ScreenRect>,
    status: Option<StatusLine<'_>>,
) -> Vec<DrawOp> {
    let mut ops = Vec::new();

    if previous != current {
        ops.extend(
            subtract(&previous, &current)
                .into_iter()
                .filter(|r| !r.is_empty())
                .map(DrawOp::Clear),
        );
    }

    let visible = intersect(&damage, &current);
    if !visible.is_empty() {
        ops.push(DrawOp::Blit {
            src: ScreenPoint::new(visible.x - current.x, visible.y - current.y),
            dest: visible,
        });
    }

    if let Some(highlight) = highlight.filter(|h| !h.is_empty()) {
        // Inversion is only undone by a blit, so it stays on the page.
        let lit = intersect(&intersect(&highlight, &damage), &current);
        if !lit.is_empty() {
            ops.push(DrawOp::Fill {
                rect: lit,
                paint: Paint::Highlight,
            });
        }
    }

    if let Some(status) = status {
        if !intersect(&status.bar, &damage).is_empty() {
            ops.push(DrawOp::Fill {
                rect: status.bar,
                paint: Paint::StatusBar,
            });
            ops.push(DrawOp::Text {
                origin: ScreenPoint::new(
                    status.bar.x + 1,
                    status.bar.y + status.bar.height - (status.descent + 1),
                ),
                text: status.text.to_owned(),
            });
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: ScreenRect = ScreenRect::new(0, 0, 600, 800);

    #[test]
    fn unchanged_placement_only_blits_damage() {
        let damage = ScreenRect::new(10, 20, 30, 40);
        let ops = plan_repaint(VIEW, VIEW, damage, None, None);
        assert_eq!(
            ops,
            vec![DrawOp::Blit {
                src: ScreenPoint::new(10, 20),
                dest: damage,
            }]
        );
    }

    #[test]
    fn scrolled_placement_clears_uncovered_strip_and_offsets_source() {
        let previous = ScreenRect::new(0, -600, 500, 2000);
        let current = ScreenRect::new(0, -1200, 500, 2000);
        let ops = plan_repaint(previous, current, ScreenRect::new(0, 0, 500, 800), None, None);
        assert_eq!(
            ops,
            vec![
                DrawOp::Clear(ScreenRect::new(0, 800, 500, 600)),
                DrawOp::Blit {
                    src: ScreenPoint::new(0, 1200),
                    dest: ScreenRect::new(0, 0, 500, 800),
                },
            ]
        );
    }

    #[test]
    fn first_paint_from_empty_placement_clears_nothing() {
        let ops = plan_repaint(ScreenRect::default(), VIEW, VIEW, None, None);
        assert_eq!(
            ops,
            vec![DrawOp::Blit {
                src: ScreenPoint::new(0, 0),
                dest: VIEW,
            }]
        );
    }

    #[test]
    fn damage_outside_page_skips_blit() {
        let page = ScreenRect::new(100, 0, 400, 800);
        let ops = plan_repaint(page, page, ScreenRect::new(0, 0, 50, 50), None, None);
        assert!(ops.is_empty());
    }

    #[test]
    fn highlight_is_clipped_to_damage() {
        let ops = plan_repaint(
            VIEW,
            VIEW,
            ScreenRect::new(0, 0, 50, 50),
            Some(ScreenRect::new(40, 40, 100, 100)),
            None,
        );
        assert_eq!(
            ops[1],
            DrawOp::Fill {
                rect: ScreenRect::new(40, 40, 10, 10),
                paint: Paint::Highlight,
            }
        );
    }

    #[test]
    fn highlight_never_leaves_the_page() {
        let page = ScreenRect::new(200, 0, 600, 800);
        let ops = plan_repaint(
            page,
            page,
            ScreenRect::new(700, 100, 300, 100),
            Some(ScreenRect::new(700, 100, 200, 100)),
            None,
        );
        assert_eq!(
            ops,
            vec![
                DrawOp::Blit {
                    src: ScreenPoint::new(500, 100),
                    dest: ScreenRect::new(700, 100, 100, 100),
                },
                DrawOp::Fill {
                    rect: ScreenRect::new(700, 100, 100, 100),
                    paint: Paint::Highlight,
                },
            ]
        );

        let off_page = plan_repaint(
            page,
            page,
            ScreenRect::new(800, 100, 100, 100),
            Some(ScreenRect::new(700, 100, 200, 100)),
            None,
        );
        assert!(off_page.is_empty());
    }

    #[test]
    fn empty_highlight_is_ignored() {
        let ops = plan_repaint(
            VIEW,
            VIEW,
            VIEW,
            Some(ScreenRect::new(40, 40, 0, 10)),
            None,
        );
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn status_bar_is_redrawn_whole_when_touched() {
        let bar = ScreenRect::new(0, 782, 600, 18);
        let status = StatusLine {
            bar,
            text: "search: foo_",
            descent: 4,
        };
        let ops = plan_repaint(VIEW, VIEW, ScreenRect::new(0, 790, 10, 10), None, Some(status));
        assert_eq!(
            &ops[1..],
            &[
                DrawOp::Fill {
                    rect: bar,
                    paint: Paint::StatusBar,
                },
                DrawOp::Text {
                    origin: ScreenPoint::new(1, 795),
                    text: "search: foo_".into(),
                },
            ]
        );

        let untouched = plan_repaint(VIEW, VIEW, ScreenRect::new(0, 0, 10, 10), None, Some(status));
        assert_eq!(untouched.len(), 1);
    }
}
