use clap::Parser;
use packmap::BloomMap;
use packmap::PackedMap;
use packmap::PairedMap;
use packmap::ProbeStats;
use packmap::hash::mix32;

#[derive(Parser, Debug)]
struct Args {
    /// Number of keys to insert and read back.
    #[arg(short = 'n', long = "count", default_value_t = 1_000_000)]
    count: u32,

    /// Initial capacity handed to each table.
    #[arg(short = 'c', long = "capacity", default_value_t = 100_000)]
    capacity: u32,
}

/// Synthetic key stream: sequential integers pushed through the mixing hash,
/// the same workload the tables see from a hashed id space.
fn keys(count: u32) -> Vec<u32> {
    (0..count).map(mix32).filter(|&key| key != 0).collect()
}

fn report(name: &str, len: usize, capacity: u32, stats: ProbeStats) {
    println!(
        "{name:>6}: {len} entries, capacity {capacity}, load {:.2}%, \
         max probe {}, avg probe {:.3}",
        len as f64 / f64::from(capacity) * 100.0,
        stats.max_probe,
        stats.average(),
    );
}

fn main() {
    let args = Args::parse();
    let keys = keys(args.count);
    println!(
        "Inserting {} hashed keys (initial capacity {})",
        keys.len(),
        args.capacity
    );

    let mut packed = PackedMap::with_capacity(args.capacity);
    let mut paired = PairedMap::with_capacity(args.capacity);
    let mut bloom = BloomMap::with_capacity(args.capacity);

    for &key in &keys {
        packed.insert(key, key).expect("packed insert");
        paired.insert(key, key).expect("paired insert");
        bloom.insert(key, key).expect("bloom insert");
    }

    let mut missing = 0usize;
    for &key in &keys {
        if packed.get(key) != Some(key)
            || paired.get(key) != Some(key)
            || bloom.get(key) != Some(key)
        {
            missing += 1;
        }
    }
    if missing > 0 {
        eprintln!("{missing} keys failed to read back");
        std::process::exit(1);
    }

    report("packed", packed.len(), packed.capacity(), packed.probe_stats());
    report("paired", paired.len(), paired.capacity(), paired.probe_stats());
    report("bloom", bloom.len(), bloom.capacity(), bloom.probe_stats());
}
