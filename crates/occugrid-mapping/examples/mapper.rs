use occugrid_mapping::record::load_grid;
use occugrid_mapping::{Mapper, RangeReading, Scan};
use rand::Rng;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A 10x10 grid with the robot tracked at the center cell
    let mut mapper = Mapper::new(10, 10, 5, 5).unwrap();

    // One sweep with a return along each axis
    let sweep: Scan = [(1.0, 0.0), (2.0, 90.0), (3.0, 180.0), (2.0, 270.0)]
        .into_iter()
        .map(RangeReading::from)
        .collect();
    let summary = mapper.update_map(&sweep);
    println!("First sweep: {} inserted, {} dropped", summary.inserted, summary.dropped);
    println!("{}", mapper.show_map());

    // Move the robot and take a random 36-beam sweep, some returns will miss the grid
    mapper.set_position(3, 4);
    let mut rng = rand::rng();
    let sweep: Scan = (0..36)
        .map(|i| RangeReading::new(rng.random_range(1.0..8.0), i as f64 * 10.0))
        .collect();
    if let Some((i, nearest)) = sweep.nearest() {
        println!("Nearest return: beam {} at {:.2} cells", i, nearest.distance);
    }
    let summary = mapper.update_map(&sweep);
    println!("Random sweep: {} inserted, {} dropped", summary.inserted, summary.dropped);
    println!("{}", mapper.grid());

    // Record and reload
    let path = std::env::temp_dir().join("occugrid_example_map.txt");
    match mapper.record_map(&path) {
        Ok(()) => {
            let restored = load_grid(&path).unwrap();
            println!(
                "Recorded to {} and reloaded a {}x{} grid with {} occupied cells",
                path.display(),
                restored.width(),
                restored.height(),
                restored.occupied_count()
            );
        }
        Err(e) => println!("Error recording map: {}", e),
    }
}
