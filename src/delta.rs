//! Inter-frame change detection.

use crate::Rgba;

/// Move every pixel whose RGB differs from the previous frame to the front of
/// `frame`, preserving order, and return how many changed. Destructive: the
/// tail of the buffer is left as-is. The palette is then trained on the
/// changed prefix only, spending its entries where the viewer will see them.
pub(crate) fn pick_changed_pixels(previous: &[Rgba], frame: &mut [Rgba]) -> usize {
    let mut num_changed = 0;

    for i in 0..frame.len() {
        let prev = previous[i];
        let cur = frame[i];
        if prev.r != cur.r || prev.g != cur.g || prev.b != cur.b {
            frame[num_changed] = cur;
            num_changed += 1;
        }
    }

    num_changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(r: u8, g: u8, b: u8) -> Rgba {
        Rgba::new(r, g, b, 255)
    }

    #[test]
    fn identical_frames_have_no_changes() {
        let previous = vec![px(1, 2, 3); 8];
        let mut frame = previous.clone();
        assert_eq!(pick_changed_pixels(&previous, &mut frame), 0);
    }

    #[test]
    fn changed_pixels_compact_to_front_in_order() {
        let previous = vec![px(0, 0, 0); 5];
        let mut frame = vec![
            px(0, 0, 0),
            px(10, 0, 0),
            px(0, 0, 0),
            px(20, 0, 0),
            px(30, 0, 0),
        ];

        let n = pick_changed_pixels(&previous, &mut frame);
        assert_eq!(n, 3);
        assert_eq!(frame[0], px(10, 0, 0));
        assert_eq!(frame[1], px(20, 0, 0));
        assert_eq!(frame[2], px(30, 0, 0));
    }

    #[test]
    fn alpha_difference_alone_is_not_a_change() {
        let previous = vec![Rgba::new(5, 5, 5, 255); 4];
        let mut frame = vec![Rgba::new(5, 5, 5, 0); 4];
        assert_eq!(pick_changed_pixels(&previous, &mut frame), 0);
    }
}
