//! Enhanced Packet Block: `interface_id`, a 64-bit
//! `timestamp_hi<<32|timestamp_lo` pair resolved through the owning
//! interface's `tsresol`, `captured_length`/`packet_length`, the packet
//! bytes themselves (dissected via [`crate::packet`] when the interface's
//! `link_type` is Ethernet), and the `ebp_flags`/`ebp_hash`/
//! `epb_dropcount` options (the `ebp_`/`epb_` prefix inconsistency on the
//! first two keys is carried over verbatim from the option table below).

use crate::block::{datetime_to_ticks, opts, ticks_to_datetime, Section};
use crate::endian::{self, align_up, Endianness};
use crate::error::{Error, Result};
use crate::packet;
use crate::value::{Record, Value};
use std::io::{Cursor, Write};

const LINKTYPE_ETHERNET: u16 = 1;

pub fn decode(body: &[u8], endianness: Endianness, section: &mut Section) -> Result<Record> {
    let mut rec = Record::new();
    let mut cur = Cursor::new(body);
    let interface_id = endian::read_u32(&mut cur, endianness)?;
    rec.insert("interface_id", interface_id as u64);

    let iface = *section.interface(interface_id)?;

    let ticks_hi = endian::read_u32(&mut cur, endianness)? as u64;
    let ticks_lo = endian::read_u32(&mut cur, endianness)? as u64;
    let ticks = (ticks_hi << 32) | ticks_lo;
    rec.insert(
        "datetime",
        Value::Timestamp(ticks_to_datetime(ticks, iface.tsresol)),
    );

    let captured_length = endian::read_u32(&mut cur, endianness)?;
    let packet_length = endian::read_u32(&mut cur, endianness)?;
    rec.insert("captured_length", captured_length as u64);
    rec.insert("packet_length", packet_length as u64);

    let start = cur.position() as usize;
    let available = body.len() - start;
    if captured_length as usize > available {
        return Err(Error::TruncatedPacket {
            captured: captured_length,
            available,
        });
    }
    let end = start + captured_length as usize;
    let packet_bytes = &body[start..end];
    if iface.link_type == LINKTYPE_ETHERNET {
        let packet_rec = packet::decode_frame(packet_bytes)?;
        for (key, value) in packet_rec.iter() {
            rec.insert(key.clone(), value.clone());
        }
    } else {
        eprintln!("Unknown link_type {}", iface.link_type);
        tracing::warn!(link_type = iface.link_type, "unknown link type");
        rec.insert("unknown_payload", packet_bytes.to_vec());
    }
    let padded_end = start + align_up(captured_length as u64, 4) as usize;

    let remaining = &body[padded_end.min(body.len())..];
    if !remaining.is_empty() {
        let raw = opts::read_options(remaining, endianness)?;
        let mut options = Record::new();
        for (code, value) in raw {
            match code {
                opts::OPT_COMMENT => {
                    options.insert("opt_comment", String::from_utf8_lossy(&value).into_owned());
                }
                2 => {
                    let v = read_u32_option(&value, endianness);
                    options.insert("ebp_flags", Value::HexU64(v as u64))
                }
                3 => options.insert("ebp_hash", Value::Bytes(value)),
                4 => options.insert(
                    "epb_dropcount",
                    Value::HexU64(opts::read_u64_option(&value, endianness)?),
                ),
                other => {
                    eprintln!("Unknown option_code {other}");
                    tracing::warn!(option_code = other, "unknown option code");
                    continue;
                }
            };
        }
        if !options.is_empty() {
            rec.insert("options", Value::Record(options));
        }
    }

    Ok(rec)
}

/// Reads a 4-byte option payload under the block's endianness. `ebp_flags`
/// is the only u32-sized EPB option, so this is a thin wrapper kept local
/// to this module.
fn read_u32_option(bytes: &[u8], endianness: Endianness) -> u32 {
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[..n].copy_from_slice(&bytes[..n]);
    match endianness {
        Endianness::Big => u32::from_be_bytes(buf),
        Endianness::Little => u32::from_le_bytes(buf),
    }
}

pub fn encode<W: Write>(
    w: &mut W,
    endianness: Endianness,
    rec: &Record,
    section: &mut Section,
) -> Result<()> {
    let interface_id = rec.get("interface_id").and_then(Value::as_u64).unwrap_or(0) as u32;
    endian::write_u32(w, endianness, interface_id)?;

    let iface = *section.interface(interface_id)?;
    let ticks = datetime_to_ticks(
        rec.get("datetime")
            .and_then(Value::as_timestamp)
            .unwrap_or_default(),
        iface.tsresol,
    );
    endian::write_u32(w, endianness, (ticks >> 32) as u32)?;
    endian::write_u32(w, endianness, ticks as u32)?;

    let packet_bytes = if iface.link_type == LINKTYPE_ETHERNET && rec.get("ethernet_data").is_some()
    {
        packet::encode_frame(rec)
    } else if let Some(payload) = rec.get("unknown_payload").and_then(Value::as_bytes) {
        payload.to_vec()
    } else {
        Vec::new()
    };

    let captured_length = rec
        .get("captured_length")
        .and_then(Value::as_u64)
        .unwrap_or(packet_bytes.len() as u64) as u32;
    let packet_length = rec
        .get("packet_length")
        .and_then(Value::as_u64)
        .unwrap_or(captured_length as u64) as u32;
    endian::write_u32(w, endianness, captured_length)?;
    endian::write_u32(w, endianness, packet_length)?;

    w.write_all(&packet_bytes)?;
    let padded = align_up(packet_bytes.len() as u64, 4) as usize;
    if padded > packet_bytes.len() {
        w.write_all(&vec![0u8; padded - packet_bytes.len()])?;
    }

    if let Some(options) = rec.get("options").and_then(Value::as_record) {
        for (key, value) in options.iter() {
            match key.as_str() {
                "opt_comment" => {
                    opts::write_option(
                        w,
                        endianness,
                        opts::OPT_COMMENT,
                        value.as_str().unwrap_or("").as_bytes(),
                    )?;
                }
                "ebp_flags" => {
                    let v = value.as_u64().unwrap_or(0) as u32;
                    let bytes = match endianness {
                        Endianness::Big => v.to_be_bytes(),
                        Endianness::Little => v.to_le_bytes(),
                    };
                    opts::write_option(w, endianness, 2, &bytes)?;
                }
                "ebp_hash" => {
                    opts::write_option(w, endianness, 3, value.as_bytes().unwrap_or(&[]))?;
                }
                "epb_dropcount" => {
                    let v = value.as_u64().unwrap_or(0);
                    opts::write_option(w, endianness, 4, &opts::encode_u64_option(endianness, v))?;
                }
                other => {
                    eprintln!("Unknown option {other}");
                }
            }
        }
    }
    opts::write_end(w, endianness)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::InterfaceParam;

    fn section_with_ethernet_interface() -> Section {
        let mut section = Section::new();
        section.interfaces.push(InterfaceParam {
            link_type: LINKTYPE_ETHERNET,
            tsresol: 1e-6,
        });
        section
    }

    fn sample_ethernet_frame() -> Vec<u8> {
        let mut eth_rec = Record::new();
        eth_rec.insert("destination", vec![0xffu8; 6]);
        eth_rec.insert("source", vec![0x11u8; 6]);
        eth_rec.insert("type", 0x0806u64); // ARP, left undissected
        let mut frame = packet::encode_ethernet(&eth_rec);
        frame.extend_from_slice(b"hello");
        frame
    }

    #[test]
    fn round_trips_interface_id_and_packet_bytes() {
        let frame = sample_ethernet_frame();
        let mut rec = Record::new();
        rec.insert("interface_id", 0u64);
        rec.insert(
            "datetime",
            Value::Timestamp(chrono::DateTime::<chrono::Utc>::default()),
        );
        rec.insert("captured_length", frame.len() as u64);
        rec.insert("packet_length", frame.len() as u64);
        let packet_rec = packet::decode_frame(&frame).unwrap();
        for (k, v) in packet_rec.iter() {
            rec.insert(k.clone(), v.clone());
        }

        let mut encode_section = section_with_ethernet_interface();
        let mut buf = Vec::new();
        encode(&mut buf, Endianness::Big, &rec, &mut encode_section).unwrap();

        let mut decode_section = section_with_ethernet_interface();
        let decoded = decode(&buf, Endianness::Big, &mut decode_section).unwrap();
        assert_eq!(
            decoded.get("captured_length").and_then(Value::as_u64),
            Some(frame.len() as u64)
        );
        assert!(decoded.get("ethernet_data").is_some());
    }

    #[test]
    fn carries_ebp_flags_and_dropcount_options() {
        let frame = sample_ethernet_frame();
        let mut rec = Record::new();
        rec.insert("interface_id", 0u64);
        rec.insert(
            "datetime",
            Value::Timestamp(chrono::DateTime::<chrono::Utc>::default()),
        );
        rec.insert("captured_length", frame.len() as u64);
        rec.insert("packet_length", frame.len() as u64);
        let packet_rec = packet::decode_frame(&frame).unwrap();
        for (k, v) in packet_rec.iter() {
            rec.insert(k.clone(), v.clone());
        }
        let mut options = Record::new();
        options.insert("ebp_flags", Value::HexU64(0x1));
        options.insert("epb_dropcount", Value::HexU64(42));
        rec.insert("options", Value::Record(options));

        let mut section = section_with_ethernet_interface();
        let mut buf = Vec::new();
        encode(&mut buf, Endianness::Big, &rec, &mut section).unwrap();

        let mut section2 = section_with_ethernet_interface();
        let decoded = decode(&buf, Endianness::Big, &mut section2).unwrap();
        let options = decoded.get("options").and_then(Value::as_record).unwrap();
        assert_eq!(options.get("ebp_flags").and_then(Value::as_u64), Some(1));
        assert_eq!(
            options.get("epb_dropcount").and_then(Value::as_u64),
            Some(42)
        );
    }

    #[test]
    fn unknown_interface_id_is_reported() {
        let mut rec = Record::new();
        rec.insert("interface_id", 9u64);
        rec.insert(
            "datetime",
            Value::Timestamp(chrono::DateTime::<chrono::Utc>::default()),
        );
        rec.insert("captured_length", 0u64);
        rec.insert("packet_length", 0u64);
        let mut section = Section::new();
        let mut buf = Vec::new();
        assert!(encode(&mut buf, Endianness::Big, &rec, &mut section).is_err());
    }

    #[test]
    fn captured_length_past_the_block_body_is_rejected_instead_of_panicking() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes()); // interface_id
        body.extend_from_slice(&0u32.to_be_bytes()); // timestamp_hi
        body.extend_from_slice(&0u32.to_be_bytes()); // timestamp_lo
        body.extend_from_slice(&100u32.to_be_bytes()); // captured_length (lies)
        body.extend_from_slice(&100u32.to_be_bytes()); // packet_length
        body.extend_from_slice(&[1, 2, 3, 4]); // far fewer bytes actually follow

        let mut section = section_with_ethernet_interface();
        match decode(&body, Endianness::Big, &mut section) {
            Err(Error::TruncatedPacket { captured: 100, available: 4 }) => {}
            other => panic!("expected TruncatedPacket, got {other:?}"),
        }
    }
}
