use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic line list for trying out the query tools
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output file; `.parquet` or `.csv`
    #[arg(default_value = "sample_lines.parquet")]
    output: PathBuf,

    /// Number of lines per species
    #[arg(short, long, default_value_t = 400)]
    lines_per_species: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Species with a rough log-strength offset, so abundant elements dominate.
const SPECIES: &[(&str, f64)] = &[
    ("H I", 0.0),
    ("He I", -1.0),
    ("O I", -3.0),
    ("C I", -3.5),
    ("Fe I", -4.5),
    ("Fe II", -5.0),
    ("Na I", -5.7),
    ("Ca II", -5.5),
    ("Ti II", -7.0),
];

struct Lines {
    wavelength: Vec<f64>,
    species: Vec<String>,
    priority: Vec<f64>,
}

fn generate(n_per_species: usize, rng: &mut SimpleRng) -> Lines {
    let mut lines = Lines {
        wavelength: Vec::new(),
        species: Vec::new(),
        priority: Vec::new(),
    };
    for &(species, offset) in SPECIES {
        for _ in 0..n_per_species {
            lines.wavelength.push((rng.uniform(3000.0, 10000.0) * 1000.0).round() / 1000.0);
            lines.species.push(species.to_string());
            // log gf-like strengths: negative, clustered near the species offset
            lines.priority.push(((offset + rng.uniform(-3.0, 1.0)) * 100.0).round() / 100.0);
        }
    }
    lines
}

fn write_parquet(path: &PathBuf, lines: &Lines) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("wavelength", DataType::Float64, false),
        Field::new("species", DataType::Utf8, false),
        Field::new("priority", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(lines.wavelength.clone())),
            Arc::new(StringArray::from(
                lines.species.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(lines.priority.clone())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_csv(path: &PathBuf, lines: &Lines) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating output file")?;
    writer.write_record(["wavelength", "species", "priority"])?;
    for i in 0..lines.wavelength.len() {
        writer.write_record([
            lines.wavelength[i].to_string(),
            lines.species[i].clone(),
            lines.priority[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let lines = generate(args.lines_per_species, &mut rng);

    let is_csv = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(&args.output, &lines)?;
    } else {
        write_parquet(&args.output, &lines)?;
    }

    println!(
        "Wrote {} lines of {} species to {}",
        lines.wavelength.len(),
        SPECIES.len(),
        args.output.display()
    );
    Ok(())
}
