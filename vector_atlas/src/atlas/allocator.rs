// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shelf packing.
//!
//! The texture is cut into horizontal bands ("shelves") from the top down. A rectangle goes
//! on the shelf with the least wasted height that still has room to the right, as long as
//! that shelf is at most half again as tall as the rectangle. Otherwise a new shelf exactly as
//! tall as the rectangle is opened below the last one, falling back to the taller shelf when
//! the texture has no rows left. Icons and glyphs of one size share a shelf height, so they
//! pack tightly.

use alloc::vec::Vec;

use super::Region;

#[derive(Clone, Copy, Debug)]
struct Shelf {
    y: u16,
    height: u16,
    /// First free column.
    cursor: u16,
}

/// Rectangle packer for one texture.
#[derive(Clone, Debug)]
pub struct ShelfAllocator {
    width: u16,
    height: u16,
    /// Gutter kept around every reservation.
    padding: u16,
    shelves: Vec<Shelf>,
}

impl ShelfAllocator {
    /// Creates an empty allocator for a `width × height` texture.
    pub fn new(width: u16, height: u16, padding: u16) -> Self {
        Self {
            width,
            height,
            padding,
            shelves: Vec::new(),
        }
    }

    /// Current texture size.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Gutter kept around every reservation.
    pub fn padding(&self) -> u16 {
        self.padding
    }

    /// Whether nothing is reserved.
    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    /// Reserves a `width × height` rectangle plus the gutter on every side.
    ///
    /// Returns the inner rectangle, or `None` if it does not fit right now. Zero-sized
    /// requests take no space and always succeed.
    pub fn reserve(&mut self, width: u16, height: u16) -> Option<Region> {
        if width == 0 || height == 0 {
            return Some(Region::EMPTY);
        }
        let padded_w = u32::from(width) + 2 * u32::from(self.padding);
        let padded_h = u32::from(height) + 2 * u32::from(self.padding);
        if padded_w > u32::from(self.width) || padded_h > u32::from(self.height) {
            return None;
        }
        // Both fit in the texture, so in u16.
        let (padded_w, padded_h) = (u16::try_from(padded_w).ok()?, u16::try_from(padded_h).ok()?);

        let texture_width = self.width;
        let best = self
            .shelves
            .iter()
            .enumerate()
            .filter(|(_, shelf)| {
                shelf.height >= padded_h && texture_width - shelf.cursor >= padded_w
            })
            .min_by_key(|(_, shelf)| shelf.height - padded_h)
            .map(|(index, _)| index);

        // A much taller shelf is only reused when no new shelf fits.
        let snug = best.filter(|&index| {
            u32::from(self.shelves[index].height - padded_h) * 2 <= u32::from(padded_h)
        });
        let index = match snug {
            Some(index) => index,
            None => {
                let top = self.shelves.last().map_or(0, |s| s.y + s.height);
                if u32::from(top) + u32::from(padded_h) <= u32::from(self.height) {
                    self.shelves.push(Shelf {
                        y: top,
                        height: padded_h,
                        cursor: 0,
                    });
                    self.shelves.len() - 1
                } else {
                    best?
                }
            }
        };

        let padding = self.padding;
        let shelf = &mut self.shelves[index];
        let region = Region::new(shelf.cursor + padding, shelf.y + padding, width, height);
        shelf.cursor += padded_w;
        Some(region)
    }

    /// Extends the texture to `width × height`, keeping every reservation.
    ///
    /// Existing shelves gain the new columns; the new rows are free for new shelves.
    pub fn grow_to(&mut self, width: u16, height: u16) {
        debug_assert!(
            width >= self.width && height >= self.height,
            "textures only grow"
        );
        self.width = width;
        self.height = height;
    }

    /// Drops every reservation.
    pub fn clear(&mut self) {
        self.shelves.clear();
    }
}
