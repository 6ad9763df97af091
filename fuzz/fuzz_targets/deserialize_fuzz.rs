//! Deserialize fuzz target: parse arbitrary messages against a fixed template
//! covering every node kind. Parsing must fail with an error, never panic.
//! Build with: cargo fuzz run deserialize_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const TEMPLATE: &str =
    "<STX>~m-(\\([{keys}\\:]{values}\\):<CR><LF>)\\\\[\\!{tag}[\\[{3:extra}\\]]\\!]<ETX>:blk~!blk!";

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let spec = wiretext::RecordSpec::new("Fuzz").template(TEMPLATE);
    let mut record = wiretext::MapRecord::new(spec);
    let _ = wiretext::Codec::new().deserialize_into(&mut record, s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run deserialize_fuzz");
}
