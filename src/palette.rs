//! Adaptive palette construction by modified median split.
//!
//! All of a frame's (changed) pixels are placed in a k-d tree over RGB space
//! and the blocks at the bottom are averaged into palette entries. The tree is
//! packed into arrays in heap fashion (the children of node `n` are `2n` and
//! `2n + 1`; nodes `2^bit_depth ..` are implicitly the leaves), so nearest
//! lookups during quantization walk the same structure without a pointer
//! graph.

use crate::delta::pick_changed_pixels;
use crate::Rgba;

/// Palette slot reserved for "keep the previous frame's pixel".
pub const TRANSPARENT_INDEX: u8 = 0;

#[derive(Debug, Clone)]
pub struct Palette {
    bit_depth: u8,

    pub(crate) r: [u8; 256],
    pub(crate) g: [u8; 256],
    pub(crate) b: [u8; 256],

    /// Channel (0 = R, 1 = G, 2 = B) each internal tree node splits on.
    tree_split_axis: [u8; 256],
    /// Component value the node splits at.
    tree_split_value: [u8; 256],
}

impl Palette {
    /// Build a palette for `frame`, training on the pixels that differ from
    /// `previous` when one is given.
    ///
    /// `for_dither` reserves the darkest and lightest image colors as
    /// dedicated entries; error diffusion needs anchors at both ends of the
    /// range or it accumulates error and smears saturated regions.
    pub fn build(
        previous: Option<&[Rgba]>,
        frame: &[Rgba],
        bit_depth: u8,
        for_dither: bool,
    ) -> Self {
        let mut pal = Self {
            bit_depth,
            r: [0; 256],
            g: [0; 256],
            b: [0; 256],
            tree_split_axis: [0; 256],
            tree_split_value: [0; 256],
        };

        // The split reorders pixels as it partitions, so it gets its own copy
        // of the frame to destroy.
        let mut pixels = frame.to_vec();
        let mut num_pixels = pixels.len();
        if let Some(previous) = previous {
            num_pixels = pick_changed_pixels(previous, &mut pixels);
        }

        let last_elt = 1usize << bit_depth;
        let split_elt = last_elt / 2;
        let split_dist = split_elt / 2;
        pal.split_range(
            &mut pixels[..num_pixels],
            1,
            last_elt,
            split_elt,
            split_dist,
            1,
            for_dither,
        );

        // Re-route queries that would descend toward the transparency leaf:
        // with axis 0 and value 0, no query component is ever below the split,
        // so the walk always takes the valid-color side first.
        pal.tree_split_value[1 << (bit_depth - 1)] = 0;
        pal.tree_split_axis[1 << (bit_depth - 1)] = 0;

        pal.r[0] = 0;
        pal.g[0] = 0;
        pal.b[0] = 0;

        pal
    }

    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// Number of color table entries (2^bit_depth), transparency slot included.
    pub fn len(&self) -> usize {
        1 << self.bit_depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Color of palette entry `index`.
    pub fn entry(&self, index: u8) -> [u8; 3] {
        let i = index as usize;
        [self.r[i], self.g[i], self.b[i]]
    }

    /// Nearest palette entry to (r, g, b), never the transparency slot.
    pub fn closest_color(&self, r: u8, g: u8, b: u8) -> u8 {
        let mut best_ind = 1;
        let mut best_diff = 1_000_000;
        self.closest(
            i32::from(r),
            i32::from(g),
            i32::from(b),
            &mut best_ind,
            &mut best_diff,
            1,
        );
        best_ind
    }

    /// Walk the k-d tree for the palette entry closest to (r, g, b) in L1
    /// distance. `best_ind` and `best_diff` are updated only when a better
    /// leaf is found, so callers seed them with their fallback entry. The far
    /// side of a split is searched only when the current best L1 distance
    /// exceeds the perpendicular distance to the split plane.
    pub(crate) fn closest(
        &self,
        r: i32,
        g: i32,
        b: i32,
        best_ind: &mut u8,
        best_diff: &mut i32,
        tree_root: usize,
    ) {
        let leaf_base = 1usize << self.bit_depth;

        // Bottom of the tree: leaf nodes hold colors.
        if tree_root > leaf_base - 1 {
            let ind = tree_root - leaf_base;
            if ind == TRANSPARENT_INDEX as usize {
                return;
            }

            let diff = (r - i32::from(self.r[ind])).abs()
                + (g - i32::from(self.g[ind])).abs()
                + (b - i32::from(self.b[ind])).abs();
            if diff < *best_diff {
                *best_ind = ind as u8;
                *best_diff = diff;
            }
            return;
        }

        let comps = [r, g, b];
        let split_comp = comps[self.tree_split_axis[tree_root] as usize];
        let split_pos = i32::from(self.tree_split_value[tree_root]);

        if split_pos > split_comp {
            self.closest(r, g, b, best_ind, best_diff, tree_root * 2);
            if *best_diff > split_pos - split_comp {
                // Cannot rule out a better entry on the far side.
                self.closest(r, g, b, best_ind, best_diff, tree_root * 2 + 1);
            }
        } else {
            self.closest(r, g, b, best_ind, best_diff, tree_root * 2 + 1);
            if *best_diff > split_comp - split_pos {
                self.closest(r, g, b, best_ind, best_diff, tree_root * 2);
            }
        }
    }

    /// Recursively split `pixels` into a balanced binary tree, assigning leaf
    /// colors to entries `first_elt..last_elt`.
    #[allow(clippy::too_many_arguments)]
    fn split_range(
        &mut self,
        pixels: &mut [Rgba],
        first_elt: usize,
        last_elt: usize,
        split_elt: usize,
        split_dist: usize,
        tree_node: usize,
        for_dither: bool,
    ) {
        if last_elt <= first_elt || pixels.is_empty() {
            return;
        }

        // Bottom of the tree: this range is a single palette entry.
        if last_elt == first_elt + 1 {
            if for_dither {
                if first_elt == 1 {
                    let (r, g, b) = darkest_color(pixels);
                    self.r[first_elt] = r;
                    self.g[first_elt] = g;
                    self.b[first_elt] = b;
                    return;
                }
                if first_elt == (1 << self.bit_depth) - 1 {
                    let (r, g, b) = lightest_color(pixels);
                    self.r[first_elt] = r;
                    self.g[first_elt] = g;
                    self.b[first_elt] = b;
                    return;
                }
            }

            let (r, g, b) = average_color(pixels);
            self.r[first_elt] = r;
            self.g[first_elt] = g;
            self.b[first_elt] = b;
            return;
        }

        let (r_range, g_range, b_range) = channel_ranges(pixels);

        // Split along the axis with the largest range. R wins only when it
        // beats both other channels; G is the default on ties.
        let mut split_axis = 1;
        if b_range > g_range {
            split_axis = 2;
        }
        if r_range > b_range && r_range > g_range {
            split_axis = 0;
        }

        let num_pixels = pixels.len();
        let sub_pixels_a = num_pixels * (split_elt - first_elt) / (last_elt - first_elt);

        partition_by_median(pixels, 0, num_pixels, split_axis, sub_pixels_a);

        self.tree_split_axis[tree_node] = split_axis as u8;
        self.tree_split_value[tree_node] = channel(pixels[sub_pixels_a], split_axis);

        let (left, right) = pixels.split_at_mut(sub_pixels_a);
        self.split_range(
            left,
            first_elt,
            split_elt,
            split_elt - split_dist,
            split_dist / 2,
            tree_node * 2,
            for_dither,
        );
        self.split_range(
            right,
            split_elt,
            last_elt,
            split_elt + split_dist,
            split_dist / 2,
            tree_node * 2 + 1,
            for_dither,
        );
    }
}

fn channel(pixel: Rgba, axis: usize) -> u8 {
    match axis {
        0 => pixel.r,
        1 => pixel.g,
        _ => pixel.b,
    }
}

/// Channel-wise minimum over the subset.
fn darkest_color(pixels: &[Rgba]) -> (u8, u8, u8) {
    let mut r = 255;
    let mut g = 255;
    let mut b = 255;
    for p in pixels {
        r = r.min(p.r);
        g = g.min(p.g);
        b = b.min(p.b);
    }
    (r, g, b)
}

/// Channel-wise maximum over the subset.
fn lightest_color(pixels: &[Rgba]) -> (u8, u8, u8) {
    let mut r = 0;
    let mut g = 0;
    let mut b = 0;
    for p in pixels {
        r = r.max(p.r);
        g = g.max(p.g);
        b = b.max(p.b);
    }
    (r, g, b)
}

/// Mean color of the subset, rounded to nearest.
fn average_color(pixels: &[Rgba]) -> (u8, u8, u8) {
    let n = pixels.len() as u64;
    let mut r: u64 = 0;
    let mut g: u64 = 0;
    let mut b: u64 = 0;
    for p in pixels {
        r += u64::from(p.r);
        g += u64::from(p.g);
        b += u64::from(p.b);
    }
    (
        ((r + n / 2) / n) as u8,
        ((g + n / 2) / n) as u8,
        ((b + n / 2) / n) as u8,
    )
}

fn channel_ranges(pixels: &[Rgba]) -> (i32, i32, i32) {
    let mut min_r = 255;
    let mut max_r = 0;
    let mut min_g = 255;
    let mut max_g = 0;
    let mut min_b = 255;
    let mut max_b = 0;

    for p in pixels {
        let (r, g, b) = (i32::from(p.r), i32::from(p.g), i32::from(p.b));
        min_r = min_r.min(r);
        max_r = max_r.max(r);
        min_g = min_g.min(g);
        max_g = max_g.max(g);
        min_b = min_b.min(b);
        max_b = max_b.max(b);
    }

    (max_r - min_r, max_g - min_g, max_b - min_b)
}

/// The partition step from quicksort, on whole pixels keyed by one channel.
/// Values equal to the pivot alternate sides so a low-entropy image (lots of
/// identical pixels) still produces balanced halves.
fn partition(pixels: &mut [Rgba], left: usize, right: usize, axis: usize, pivot_index: usize) -> usize {
    let pivot_value = channel(pixels[pivot_index], axis);
    pixels.swap(pivot_index, right - 1);

    let mut store_index = left;
    let mut split = false;
    for i in left..right - 1 {
        let val = channel(pixels[i], axis);
        if val < pivot_value {
            pixels.swap(i, store_index);
            store_index += 1;
        } else if val == pivot_value {
            if split {
                pixels.swap(i, store_index);
                store_index += 1;
            }
            split = !split;
        }
    }

    pixels.swap(store_index, right - 1);
    store_index
}

/// Incomplete quicksort: recurse only into the half that contains the wanted
/// median, leaving the other half unordered.
fn partition_by_median(
    pixels: &mut [Rgba],
    left: usize,
    right: usize,
    axis: usize,
    needed_center: usize,
) {
    if left + 1 < right {
        let pivot_index = left + (right - left) / 2;
        let pivot_index = partition(pixels, left, right, axis, pivot_index);

        if pivot_index > needed_center {
            partition_by_median(pixels, left, pivot_index, axis, needed_center);
        }
        if pivot_index < needed_center {
            partition_by_median(pixels, pivot_index + 1, right, axis, needed_center);
        }
    }
}
