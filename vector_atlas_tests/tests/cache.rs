// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use vector_atlas::{
    AtlasConfig, Backend, RasterOptions, RasterizeError, StrokeOptions, SvgAtlas, SvgAtlasConfig,
};

use crate::util::{BADGE, SQUARE, backends, render};

fn small_atlas() -> SvgAtlas {
    SvgAtlas::new(SvgAtlasConfig {
        atlas: AtlasConfig {
            initial_size: (64, 64),
            max_size: 64,
            padding: 1,
        },
        ..SvgAtlasConfig::default()
    })
}

#[test]
fn cache_hit_skips_rasterization() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let stroke = StrokeOptions::new(1.5);
    let first = atlas.get_or_rasterize(BADGE, 20.0, 24.0, true, stroke).unwrap();
    let second = atlas.get_or_rasterize(BADGE, 20.0, 24.0, true, stroke).unwrap();
    assert_eq!(first, second);

    let stats = atlas.stats();
    assert_eq!(stats.rasterizations, 1, "the second call is served from the cache");
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[test]
fn cache_regions_do_not_overlap() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let a = atlas
        .get_or_rasterize(SQUARE, 10.0, 16.0, true, StrokeOptions::disabled())
        .unwrap()
        .region;
    let b = atlas
        .get_or_rasterize(BADGE, 20.0, 16.0, true, StrokeOptions::disabled())
        .unwrap()
        .region;
    let overlap_x = a.x < b.x + b.width && b.x < a.x + a.width;
    let overlap_y = a.y < b.y + b.height && b.y < a.y + a.height;
    assert!(!(overlap_x && overlap_y), "{a:?} and {b:?} overlap");
}

#[test]
fn cache_copies_pixels_into_atlas() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let result = atlas
        .get_or_rasterize(SQUARE, 10.0, 6.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!((result.region.width, result.region.height), (6, 6));
    assert_eq!((result.offset_x, result.offset_y), (0, 0));

    let rows: Vec<&[u8]> = atlas.atlas().region_rows(result.region).collect();
    assert_eq!(rows.len(), 6);
    for row in rows {
        assert!(
            row.chunks_exact(4).all(|px| px == [255, 0, 0, 255]),
            "filled square in the red channel"
        );
    }

    let dirty = atlas.atlas_mut().take_dirty_region();
    assert_eq!(dirty, Some(result.region));
    assert_eq!(atlas.atlas_mut().take_dirty_region(), None);

    let uv = atlas.atlas().uv_rect(result.region);
    let width = f32::from(atlas.atlas().width());
    assert!((uv.u1 - uv.u0 - 6.0 / width).abs() < 1e-6, "{uv:?}");
}

#[test]
fn cache_eviction_clears_everything_once() {
    let mut atlas = small_atlas();
    let first = atlas
        .key_for(SQUARE, 10.0, 32.0, true, StrokeOptions::disabled())
        .unwrap();
    atlas
        .get_or_rasterize(SQUARE, 10.0, 32.0, true, StrokeOptions::disabled())
        .unwrap();
    assert!(atlas.peek(&first).is_some());
    let generation = atlas.atlas().generation();

    // A 64 pixel atlas with a 1 pixel gutter holds a single 32 pixel icon.
    atlas
        .get_or_rasterize(BADGE, 20.0, 32.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(atlas.atlas().generation(), generation + 1);
    assert!(atlas.peek(&first).is_none(), "evicted entries are no longer hits");
    assert_eq!(atlas.len(), 1);
    assert_eq!(atlas.stats().evictions, 1);

    atlas
        .get_or_rasterize(SQUARE, 10.0, 32.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(atlas.stats().rasterizations, 3, "the first icon is drawn again");
}

#[test]
fn cache_grows_before_evicting() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig {
        atlas: AtlasConfig {
            initial_size: (32, 32),
            max_size: 128,
            padding: 1,
        },
        ..SvgAtlasConfig::default()
    });
    let first = atlas
        .get_or_rasterize(SQUARE, 10.0, 24.0, true, StrokeOptions::disabled())
        .unwrap();
    let generation = atlas.atlas().generation();
    atlas
        .get_or_rasterize(BADGE, 20.0, 24.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(atlas.atlas().width(), 64);
    assert!(atlas.atlas().generation() > generation, "growing changes the texture");
    assert_eq!(atlas.stats().evictions, 0);

    // The first icon survived the grow, pixels included.
    let key = atlas
        .key_for(SQUARE, 10.0, 24.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(atlas.peek(&key), Some(first));
    let row = atlas.atlas().region_rows(first.region).next().unwrap();
    assert_eq!(&row[..4], &[255, 0, 0, 255]);
}

#[test]
fn cache_key_quantizes_stroke_width() {
    // One viewbox unit per device pixel, so quarter units are quarter pixels.
    let atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let key = |width| {
        atlas
            .key_for(BADGE, 20.0, 20.0, false, StrokeOptions::new(width))
            .unwrap()
    };
    assert_eq!(key(1.01), key(1.12));
    assert_ne!(key(1.01), key(1.30));
}

#[test]
fn cache_key_quantizes_in_device_pixels() {
    let atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let key = |viewbox, width| {
        atlas
            .key_for(BADGE, viewbox, 64.0, false, StrokeOptions::new(width))
            .unwrap()
    };
    // 80 and 200 units of a 1000 unit viewbox are 5.12px and 12.8px.
    assert_ne!(key(1000.0, 80.0), key(1000.0, 200.0));
    assert_eq!(key(1000.0, 200.0).stroke_width_px(), 12.75);
    // 0.05 units of a unit viewbox is 3.2px, not a quarter of the viewbox.
    assert_eq!(key(1.0, 0.05).stroke_width_px(), 3.25);
}

#[test]
fn cache_stroke_matches_direct_render() {
    const LINE: &[u8] = b"M0.1 0.5 L0.9 0.5";
    for backend in backends() {
        let mut atlas = SvgAtlas::new(SvgAtlasConfig {
            backend,
            ..SvgAtlasConfig::default()
        });
        // 3.25px, exactly representable in quarter pixels.
        let width = 3.25 / 64.0;
        let result = atlas
            .get_or_rasterize(LINE, 1.0, 64.0, false, StrokeOptions::new(width))
            .unwrap();
        let direct = render(backend, LINE, 1.0, 64, &RasterOptions::stroke(width)).unwrap();
        let cached: Vec<u8> = atlas
            .atlas()
            .region_rows(result.region)
            .flatten()
            .copied()
            .collect();
        assert_eq!(cached, direct, "{backend:?}");
    }
}

#[test]
fn cache_quantized_strokes_share_an_entry() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig::default());
    let a = atlas
        .get_or_rasterize(BADGE, 20.0, 20.0, false, StrokeOptions::new(1.01))
        .unwrap();
    let b = atlas
        .get_or_rasterize(BADGE, 20.0, 20.0, false, StrokeOptions::new(1.12))
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(atlas.stats().rasterizations, 1);
}

#[test]
fn cache_device_size_rounds_up() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig {
        scale_factor: 1.5,
        ..SvgAtlasConfig::default()
    });
    // 15 * 1.5 = 22.5 and 15.2 * 1.5 = 22.8 both need 23 pixels.
    let a = atlas
        .get_or_rasterize(SQUARE, 10.0, 15.0, true, StrokeOptions::disabled())
        .unwrap();
    let b = atlas
        .get_or_rasterize(SQUARE, 10.0, 15.2, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(a.region.width, 23);
    assert_eq!(a, b);
    assert_eq!(atlas.stats().rasterizations, 1);

    let c = atlas
        .get_or_rasterize(SQUARE, 10.0, 15.4, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(c.region.width, 24);

    atlas.set_scale_factor(2.0);
    let d = atlas
        .get_or_rasterize(SQUARE, 10.0, 15.0, true, StrokeOptions::disabled())
        .unwrap();
    assert_eq!(d.region.width, 30);
    assert_eq!(atlas.stats().rasterizations, 3);
}

#[test]
fn cache_failures_leave_no_entry() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig::default());
    assert_eq!(
        atlas.get_or_rasterize(SQUARE, 10.0, 300.0, true, StrokeOptions::disabled()),
        Err(RasterizeError::IconTooLarge)
    );
    assert_eq!(
        atlas.get_or_rasterize(b"M0 0 L", 10.0, 16.0, true, StrokeOptions::disabled()),
        Err(RasterizeError::EmptyPath)
    );
    assert_eq!(
        atlas.get_or_rasterize(SQUARE, 10.0, 0.0, true, StrokeOptions::disabled()),
        Err(RasterizeError::EmptyPath)
    );
    assert!(atlas.is_empty());
    assert_eq!(atlas.atlas().generation(), 0);
}

#[test]
fn cache_unsupported_backend_caches_nothing() {
    let mut atlas = SvgAtlas::new(SvgAtlasConfig {
        backend: Backend::Unsupported,
        ..SvgAtlasConfig::default()
    });
    assert_eq!(atlas.backend(), Backend::Unsupported);
    assert_eq!(
        atlas.get_or_rasterize(SQUARE, 10.0, 16.0, true, StrokeOptions::disabled()),
        Err(RasterizeError::PlatformNotSupported)
    );
    assert!(atlas.is_empty());
    assert_eq!(atlas.stats().rasterizations, 0);
}
