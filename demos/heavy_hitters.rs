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
use fastsketches::space_saving::SpaceSaving;

fn main() {
    // Track heavy hitters over 96 slots.
    let mut sketch: SpaceSaving<u64> = SpaceSaving::new();

    // Synthetic traffic: a handful of hot keys over wide background noise.
    for _ in 0..5_000 {
        sketch.insert(1_001);
    }
    for _ in 0..3_000 {
        sketch.insert(1_002);
    }
    for _ in 0..1_000 {
        sketch.insert(1_003);
    }
    for noise in 0..20_000_u64 {
        sketch.insert(10_000 + noise % 4_000);
    }

    let mut tracked: Vec<(u64, u64)> = sketch.tracked().collect();
    tracked.sort_by_key(|&(_, weight)| std::cmp::Reverse(weight));

    println!("tracked slots: {}", tracked.len());
    println!("minimum tracked weight: {}", sketch.min_weight());
    for (key, weight) in tracked.iter().take(5) {
        println!("key {key:>6} -> weight {weight}");
    }
}
