//! Seeded input patterns for tests and benchmarks.
//!
//! All generators draw from one process wide seed, see [`random_init_seed`], so a failing run can
//! be reproduced by pinning the printed seed.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use rand::distributions::Uniform;
use rand::prelude::*;

use crate::point::{Point2D, TinPoint};

// --- Public ---

pub fn random(size: usize) -> Vec<i32> {
    //     .
    // : . : :
    // :.:::.::

    let mut rng = new_seed();
    (0..size).map(|_| rng.gen::<i32>()).collect()
}

pub fn random_uniform<R>(size: usize, range: R) -> Vec<i32>
where
    R: Into<Uniform<i32>>,
{
    // :.:.:.::
    let mut rng = new_seed();
    let dist: Uniform<i32> = range.into();

    (0..size).map(|_| dist.sample(&mut rng)).collect()
}

pub fn all_equal(size: usize) -> Vec<i32> {
    // ......
    // ::::::

    vec![66; size]
}

pub fn ascending(size: usize) -> Vec<i32> {
    //     .:
    //   .:::
    // .:::::

    (0..size as i32).collect()
}

pub fn descending(size: usize) -> Vec<i32> {
    // :.
    // :::.
    // :::::.

    (0..size as i32).rev().collect()
}

pub fn saw_mixed(size: usize, saw_count: usize) -> Vec<i32> {
    // :.  :.    .::.    .:
    // :::.:::..::::::..:::

    if size == 0 {
        return Vec::new();
    }

    let mut vals = random(size);
    let chunk_size = (size / saw_count.max(1)).max(1);
    let directions = random_uniform((size / chunk_size) + 1, 0..=1);

    for (chunk, &direction) in vals.chunks_mut(chunk_size).zip(directions.iter()) {
        if direction == 0 {
            chunk.sort_unstable();
        } else {
            chunk.sort_unstable_by_key(|&e| std::cmp::Reverse(e));
        }
    }

    vals
}

pub fn pipe_organ(size: usize) -> Vec<i32> {
    //   .:.
    // .:::::.

    let mut vals = random(size);

    let (first_half, second_half) = vals.split_at_mut(size / 2);
    first_half.sort_unstable();
    second_half.sort_unstable_by_key(|&e| std::cmp::Reverse(e));

    vals
}

/// Points scattered over a 1000 by 1000 square. Ties are practically absent.
pub fn random_points(size: usize) -> Vec<Point2D> {
    let mut rng = new_seed();
    let dist = Uniform::new(0.0f64, 1000.0);

    (0..size)
        .map(|_| Point2D::new(dist.sample(&mut rng), dist.sample(&mut rng)))
        .collect()
}

/// Points snapped to a `cells` by `cells` integer grid, so equal x and fully equal points are
/// frequent once `size` exceeds the cell count.
pub fn grid_points(size: usize, cells: u32) -> Vec<Point2D> {
    let mut rng = new_seed();
    let dist = Uniform::new(0, cells.max(1));

    (0..size)
        .map(|_| {
            let x = dist.sample(&mut rng);
            let y = dist.sample(&mut rng);
            Point2D::new(f64::from(x), f64::from(y))
        })
        .collect()
}

/// Points with pairwise distinct x, in random order.
pub fn unique_points(size: usize) -> Vec<Point2D> {
    let mut rng = new_seed();
    let mut xs: Vec<u32> = (0..size as u32).collect();
    xs.shuffle(&mut rng);

    xs.into_iter()
        .map(|x| Point2D::new(f64::from(x), rng.gen_range(-50.0..50.0)))
        .collect()
}

/// Triangulation points on a grid, `id` numbering the load order.
pub fn tin_points(size: usize, cells: u32) -> Vec<TinPoint> {
    grid_points(size, cells)
        .into_iter()
        .zip(random_uniform(size, -100..=100))
        .enumerate()
        .map(|(id, (p, z))| TinPoint::new(p.x, p.y, f64::from(z), id as u32))
        .collect()
}

static USE_FIXED_SEED: AtomicBool = AtomicBool::new(true);

pub fn disable_fixed_seed() {
    USE_FIXED_SEED.store(false, Ordering::Release);
}

pub fn random_init_seed() -> u64 {
    if USE_FIXED_SEED.load(Ordering::Acquire) {
        static SEED: OnceCell<u64> = OnceCell::new();
        *SEED.get_or_init(|| -> u64 { thread_rng().gen() })
    } else {
        thread_rng().gen()
    }
}

// --- Private ---

fn new_seed() -> StdRng {
    StdRng::seed_from_u64(random_init_seed())
}
