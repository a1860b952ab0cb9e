//! Tile plan for scrambled page images. Sources that serve shuffled images
//! tag the page URL with a `#scrambled_{offset}` fragment; given the image
//! dimensions, [`descramble_plan`] tells the host which source tile to copy
//! into each destination tile to rebuild the readable image.

use crate::models::Rect;

const PIECE_SIZE: i32 = 200;
const MIN_SPLIT_COUNT: i32 = 5;

/// `(source, destination)` tile pairs covering the whole image.
pub type TilePlan = Vec<(Rect, Rect)>;

/// Offset encoded in a page URL fragment, if the image is scrambled.
pub fn scramble_offset(url: &str) -> Option<i32> {
    let fragment = url.split_once('#')?.1;
    fragment.strip_prefix("scrambled_")?.parse().ok()
}

fn ceil_div(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

/// Compute the unshuffle plan for an image of `width` x `height` pixels.
///
/// The grid is at most 200px per tile but always at least a 5x5 split; the
/// last row and column are margin tiles that stay in place, and every other
/// tile comes from position `(max - i + offset) % max` along each axis.
pub fn descramble_plan(width: i32, height: i32, offset: i32) -> TilePlan {
    let piece_width = PIECE_SIZE.min(ceil_div(width, MIN_SPLIT_COUNT));
    let piece_height = PIECE_SIZE.min(ceil_div(height, MIN_SPLIT_COUNT));
    let x_max = ceil_div(width, piece_width) - 1;
    let y_max = ceil_div(height, piece_height) - 1;

    let mut plan = Vec::with_capacity(((x_max + 1) * (y_max + 1)) as usize);
    for y in 0..=y_max {
        for x in 0..=x_max {
            let x_dst = piece_width * x;
            let y_dst = piece_height * y;
            let w = piece_width.min(width - x_dst);
            let h = piece_height.min(height - y_dst);

            let x_src = piece_width
                * if x == x_max { x } else { (x_max - x + offset).rem_euclid(x_max) };
            let y_src = piece_height
                * if y == y_max { y } else { (y_max - y + offset).rem_euclid(y_max) };

            plan.push((
                Rect::new(x_src, y_src, x_src + w, y_src + h),
                Rect::new(x_dst, y_dst, x_dst + w, y_dst + h),
            ));
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_parsing() {
        assert_eq!(scramble_offset("https://cdn.x/1.jpg#scrambled_3"), Some(3));
        assert_eq!(scramble_offset("https://cdn.x/1.jpg"), None);
        assert_eq!(scramble_offset("https://cdn.x/1.jpg#preview"), None);
    }

    #[test]
    fn small_image_splits_five_ways() {
        // 600px wide: tiles become 120px (600/5), not the 200px cap.
        let plan = descramble_plan(600, 600, 1);
        assert_eq!(plan.len(), 25);
        let (_, dst) = plan[0];
        assert_eq!(dst.width(), 120);
    }

    #[test]
    fn plan_covers_image_exactly_once() {
        let (width, height) = (850, 1300);
        let plan = descramble_plan(width, height, 2);
        let area: i32 = plan.iter().map(|(_, d)| d.width() * d.height()).sum();
        assert_eq!(area, width * height);
        // Source and destination tiles always agree in size.
        for (src, dst) in &plan {
            assert_eq!(src.width(), dst.width());
            assert_eq!(src.height(), dst.height());
        }
    }

    #[test]
    fn margin_tiles_stay_in_place() {
        let plan = descramble_plan(1000, 1000, 3);
        // 1000/200 = 5 tiles per axis, margins at index 4.
        let (src, dst) = plan.last().copied().unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn interior_tiles_are_reversed_and_shifted() {
        // 600x600, offset 1: tiles are 120px, max index 4 (margin).
        // x=0 maps to (4 - 0 + 1) % 4 = 1.
        let plan = descramble_plan(600, 600, 1);
        let (src, dst) = plan[0];
        assert_eq!(dst, Rect::new(0, 0, 120, 120));
        assert_eq!(src, Rect::new(120, 120, 240, 240));
    }

    #[test]
    fn zero_offset_still_reverses() {
        let plan = descramble_plan(600, 600, 0);
        let (src, _) = plan[0];
        // (4 - 0 + 0) % 4 = 0: first tile maps to itself at offset 0.
        assert_eq!(src, Rect::new(0, 0, 120, 120));
    }
}
