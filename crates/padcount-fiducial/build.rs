//! Generates `builtins.rs` from `data/*_CODES.json`.
//!
//! Each file stores the OpenCV byte lists for one dictionary: cells packed
//! row-major, most significant bit first, with 1 meaning a white cell. The
//! generated codes are row-major with bit `i` set when cell `i` is black.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Deserialize)]
struct DictionaryFile {
    name: String,
    marker_size: usize,
    max_correction_bits: u8,
    bytes: Vec<Vec<u8>>,
}

fn pack_code(bytes: &[u8], bits: usize) -> u64 {
    let mut code = 0u64;
    for i in 0..bits {
        let byte = bytes[i / 8];
        let white = (byte >> (7 - i % 8)) & 1 == 1;
        if !white {
            code |= 1 << i;
        }
    }
    code
}

fn load(path: &Path) -> DictionaryFile {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
    let dict: DictionaryFile = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("parsing {}: {e}", path.display()));
    let bits = dict.marker_size * dict.marker_size;
    assert!(bits <= 64, "{}: {bits} bits do not fit a u64", dict.name);
    for (id, b) in dict.bytes.iter().enumerate() {
        assert_eq!(b.len(), bits.div_ceil(8), "{} id {id}: byte count", dict.name);
    }
    dict
}

fn main() {
    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    println!("cargo:rerun-if-changed={}", data_dir.display());

    let mut paths: Vec<PathBuf> = fs::read_dir(&data_dir)
        .unwrap_or_else(|e| panic!("listing {}: {e}", data_dir.display()))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_CODES.json"))
        })
        .collect();
    paths.sort();

    let mut out = String::new();
    let mut names = Vec::new();
    for path in &paths {
        println!("cargo:rerun-if-changed={}", path.display());
        let dict = load(path);
        let bits = dict.marker_size * dict.marker_size;
        let ident = dict.name.trim_start_matches("DICT_");

        writeln!(out, "const CODES_{ident}: [u64; {}] = [", dict.bytes.len()).unwrap();
        for chunk in dict.bytes.chunks(8) {
            let row: Vec<String> = chunk
                .iter()
                .map(|b| format!("0x{:04x}", pack_code(b, bits)))
                .collect();
            writeln!(out, "    {},", row.join(", ")).unwrap();
        }
        writeln!(out, "];\n").unwrap();

        writeln!(
            out,
            "/// {} markers, {n}x{n} inner bits.",
            dict.bytes.len(),
            n = dict.marker_size
        )
        .unwrap();
        writeln!(
            out,
            "pub const {name}: Dictionary = Dictionary {{\n    name: \"{name}\",\n    marker_size: {},\n    max_correction_bits: {},\n    codes: &CODES_{ident},\n}};\n",
            dict.marker_size,
            dict.max_correction_bits,
            name = dict.name,
        )
        .unwrap();
        names.push(dict.name);
    }

    let quoted: Vec<String> = names.iter().map(|n| format!("\"{n}\"")).collect();
    writeln!(out, "/// Names of all embedded dictionaries.").unwrap();
    writeln!(
        out,
        "pub const BUILTIN_DICTIONARY_NAMES: &[&str] = &[{}];\n",
        quoted.join(", ")
    )
    .unwrap();
    writeln!(out, "/// Look up an embedded dictionary by name.").unwrap();
    writeln!(out, "pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {{").unwrap();
    writeln!(out, "    match name {{").unwrap();
    for n in &names {
        writeln!(out, "        \"{n}\" => Some({n}),").unwrap();
    }
    writeln!(out, "        _ => None,\n    }}\n}}").unwrap();

    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR")).join("builtins.rs");
    fs::write(&dest, out).unwrap_or_else(|e| panic!("writing {}: {e}", dest.display()));
}
