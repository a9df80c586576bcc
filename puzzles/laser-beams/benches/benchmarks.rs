use laser_beams::{Direction, Grid, Level, PartKind, Position, SolverOptions};

fn main() {
    divan::main();
}

#[divan::bench(sample_count = 10)]
fn solve_laser_pyramid() {
    let mut puzzle = Level::laser_pyramid().unwrap().build().unwrap();
    divan::black_box(puzzle.solve(SolverOptions::default()).unwrap());
}

#[divan::bench]
fn place_and_remove_mirror(bencher: divan::Bencher) {
    let mut puzzle = Level::laser_pyramid().unwrap().build().unwrap();
    let mirror = puzzle
        .grid
        .spawn(PartKind::Mirror, Position::new(2, 1), Direction::West);

    bencher.bench_local(|| {
        puzzle.grid.place(divan::black_box(mirror)).unwrap();
        puzzle.grid.remove(mirror).unwrap();
    });
}

#[divan::bench(args = [8, 32, 128])]
fn long_beam(width: usize) {
    let mut grid = Grid::new(width, 1);
    let emitter = grid
        .insert(PartKind::Emitter, Position::ZERO, Direction::East)
        .unwrap();
    grid.remove(divan::black_box(emitter)).unwrap();
}
