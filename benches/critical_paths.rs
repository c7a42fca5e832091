//! Criterion benchmarks for spritepack critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Sheet codec: run-length encoding and decoding
//! - Atlas codec: metadata decoding
//! - Free area: the free-space search run before placing new sprites

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use spritepack::atlas::Atlas;
use spritepack::repack::free_area;
use spritepack::sheet::{decode_sheet, encode_sheet, SheetDecodeMode};
use spritepack::sprite::Sprite;
use spritepack::tileset::Tileset;
use std::io::Cursor;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Sheet whose top half is covered by solid tiles of a few colors.
fn make_sheet(size: u32, tile: u32) -> RgbaImage {
    let mut sheet = RgbaImage::new(size, size);
    for y in 0..size / 2 {
        for x in 0..size {
            let shade = (((x / tile) + (y / tile)) % 4) as u8 * 60;
            sheet.put_pixel(x, y, Rgba([shade, 255 - shade, 128, 255]));
        }
    }
    sheet
}

/// Sheet with per-pixel noise, the worst case for run-length coding.
fn make_noisy_sheet(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8;
        Rgba([v, v.wrapping_add(1), v.wrapping_add(2), 255])
    })
}

fn make_atlas(sprites: usize, sheet: u32) -> Atlas {
    let mut atlas = Atlas::new("bench", (0.0, 0.0));
    let cols = (sprites as f32).sqrt().ceil() as usize;
    let mut tiles = Tileset::new("tiles", 16, 16, cols, sprites.div_ceil(cols));
    for i in 0..sprites {
        let name = format!("tiles_{}_{}", i % cols, i / cols);
        let mut sprite = Sprite::unplaced(&name, 16, 16);
        sprite.place_at((i % cols) as u32 * 16, (i / cols) as u32 * 16, sheet, sheet);
        atlas.push_sprite(sprite);
        tiles.set_cell(i % cols, i / cols, Some(name));
    }
    atlas.tilesets.push(tiles);
    atlas
}

fn encoded(sheet: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    encode_sheet(sheet, &mut bytes).expect("encoding into memory cannot fail");
    bytes
}

// =============================================================================
// Sheet Codec Benchmarks
// =============================================================================

fn bench_sheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("sheet");

    for size in [256u32, 1024].iter() {
        let sheet = make_sheet(*size, 16);
        let bytes = encoded(&sheet);
        group.throughput(Throughput::Elements((*size as u64) * (*size as u64)));

        group.bench_with_input(BenchmarkId::new("encode_tiles", size), &sheet, |b, sheet| {
            b.iter(|| {
                let mut out = Vec::with_capacity(bytes.len());
                encode_sheet(black_box(sheet), &mut out)
            })
        });
        group.bench_with_input(BenchmarkId::new("decode_tiles", size), &bytes, |b, bytes| {
            b.iter(|| decode_sheet(Cursor::new(black_box(bytes)), SheetDecodeMode::Strict))
        });
    }

    let noisy = make_noisy_sheet(512);
    let noisy_bytes = encoded(&noisy);
    group.bench_function("encode_noise_512", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(noisy_bytes.len());
            encode_sheet(black_box(&noisy), &mut out)
        })
    });
    group.bench_function("decode_noise_512", |b| {
        b.iter(|| decode_sheet(Cursor::new(black_box(&noisy_bytes)), SheetDecodeMode::Strict))
    });

    group.finish();
}

// =============================================================================
// Atlas Codec Benchmarks
// =============================================================================

fn bench_atlas(c: &mut Criterion) {
    let mut group = c.benchmark_group("atlas");

    for count in [100usize, 1000].iter() {
        let mut bytes = Vec::new();
        make_atlas(*count, 4096).encode(&mut bytes).expect("encoding into memory cannot fail");

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("decode", count), &bytes, |b, bytes| {
            b.iter(|| Atlas::decode(Cursor::new(black_box(bytes))))
        });
    }

    group.finish();
}

// =============================================================================
// Free Area Benchmarks
// =============================================================================

fn bench_free_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_area");

    for size in [512u32, 2048].iter() {
        let half = make_sheet(*size, 16);
        group.bench_with_input(BenchmarkId::new("half_full", size), &half, |b, sheet| {
            b.iter(|| free_area(black_box(sheet)))
        });

        let empty = RgbaImage::new(*size, *size);
        group.bench_with_input(BenchmarkId::new("empty", size), &empty, |b, sheet| {
            b.iter(|| free_area(black_box(sheet)))
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_sheet, bench_atlas, bench_free_area);

criterion_main!(benches);
