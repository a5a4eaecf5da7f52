use afl::*;

use plato_cmp::maxbits::VERSION_1;
use plato_cmp::decompress_entity;

fn main() {
    fuzz!(|data: &[u8]| {
        let mb = VERSION_1;
        let _ = decompress_entity(data, None, None, None, &mb);
    })
}
