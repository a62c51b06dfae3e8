#![no_main]

use jvdb_wire::{decode_composite, read_packet, IdSizes, Packet};
use libfuzzer_sys::fuzz_target;

/// First byte picks 4- or 8-byte ids per kind, as VMs report either.
fn id_sizes(seed: u8) -> IdSizes {
    let width = |bit: u8| if seed & (1 << bit) == 0 { 8 } else { 4 };
    IdSizes {
        field_id: width(0),
        method_id: width(1),
        object_id: width(2),
        reference_type_id: width(3),
        frame_id: width(4),
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&seed, rest)) = data.split_first() else {
        return;
    };
    let sizes = id_sizes(seed);

    // Raw composite bodies.
    let _ = decode_composite(rest, sizes);

    // Framed packets: whatever the reader accepts must decode without panicking.
    let mut reader = rest;
    while let Ok(Some(packet)) = read_packet(&mut reader) {
        if let Packet::Command(command) = packet {
            let _ = decode_composite(&command.data, sizes);
        }
    }
});
