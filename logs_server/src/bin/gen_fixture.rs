// Copyright 2024-2025 Andres Morey
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Writes a synthetic numbered-line log file for manual testing and
//! benchmarking, matching the `large.log` scenario in `SPEC_FULL.md` §8.
//! Not part of the core: purely a developer convenience, never invoked by
//! `logs_server` itself.

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{arg, command, value_parser};

fn main() -> Result<(), Box<dyn Error>> {
    let matches = command!()
        .arg(
            arg!(-o --out <FILE> "Path to write the generated log file to")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-n --lines <COUNT> "Number of numbered lines to generate")
                .default_value("1000000")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    let out_path = matches.get_one::<PathBuf>("out").expect("required");
    let lines = *matches.get_one::<u64>("lines").expect("has a default");

    let file = File::create(out_path)?;
    let mut writer = BufWriter::with_capacity(1 << 20, file);

    for i in 0..lines {
        let parity = if i % 2 == 0 { "even" } else { "odd" };
        writeln!(writer, "{i} is {parity}")?;
    }

    writer.flush()?;

    println!("wrote {lines} lines to {}", out_path.display());

    Ok(())
}
