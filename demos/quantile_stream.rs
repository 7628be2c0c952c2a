// MIT License
//
// Copyright (c) 2026 Raja Lehtihet & Wael El Oraiby
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//
use fastsketches::kll::KllSketch;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build a KLL sketch over a synthetic latency stream in milliseconds.
    let mut sketch: KllSketch<f64> = KllSketch::new(200)?;

    for i in 0..100_000_u64 {
        let latency_ms = 5.0 + (i % 1_000) as f64 / 10.0;
        sketch.insert(latency_ms);
    }

    println!("inserted: {}", sketch.n());
    println!(
        "retained: {} items in {} backing slots",
        sketch.retained(),
        sketch.max_capacity()
    );
    println!("levels: {}", sketch.num_levels());
    for level in 0..sketch.num_levels() {
        println!(
            "  level {level}: {:>3} items, each weighing {}",
            sketch.level_items(level).len(),
            1_u64 << level
        );
    }

    Ok(())
}
