//! Generate synthetic measurement workbooks for manual testing:
//! warm-up rows, then a handful of cycles with a dip below the boundary
//! followed by a noisy plateau around the plug-in depth.

use rust_xlsxwriter::Workbook;

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One channel trace: warm-up noise, then `cycles` dips followed by noisy
/// plateaus around `depth`.
fn generate_channel(rng: &mut SimpleRng, cycles: usize, depth: f64, plateau_len: usize) -> Vec<f64> {
    let mut trace = Vec::new();

    for _ in 0..20 {
        trace.push(rng.gauss(0.002, 0.001).abs());
    }

    for _ in 0..cycles {
        trace.push(rng.gauss(0.004, 0.002).abs().min(0.009));
        for _ in 0..plateau_len {
            trace.push(rng.gauss(depth, depth * 0.02).abs());
        }
    }

    trace
}

fn write_workbook(
    path: &str,
    rng: &mut SimpleRng,
    cycles: usize,
    injection: bool,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let infusion = generate_channel(rng, cycles, 0.65, 8);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    sheet.write_string(0, 0, "Infusion")?;
    for (i, v) in infusion.iter().enumerate() {
        sheet.write_number(i as u32 + 1, 0, *v)?;
    }

    if injection {
        let trace = generate_channel(rng, cycles, 0.40, 8);
        sheet.write_string(0, 1, "Injection")?;
        for (i, v) in trace.iter().enumerate() {
            sheet.write_number(i as u32 + 1, 1, *v)?;
        }
    }

    workbook.save(path)?;
    println!("Wrote {} cycles to {path}", cycles);
    Ok(())
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let out_dir = "sample_measurements";
    std::fs::create_dir_all(out_dir).expect("Failed to create output folder");

    let samples: [(&str, usize, bool); 3] = [
        ("port_a_two_port.xlsx", 5, true),
        ("port_b_two_port.xlsx", 8, true),
        ("port_c_one_port.xlsx", 4, false),
    ];

    for (name, cycles, injection) in samples {
        let path = format!("{out_dir}/{name}");
        write_workbook(&path, &mut rng, cycles, injection).expect("Failed to write workbook");
    }
}
