//! In-memory capture construction for integration tests.

#![allow(dead_code)]

use sluice_proto::rdata::{RData, A};
use sluice_proto::{Message, Name, Question, RecordClass, RecordType, ResourceRecord};
use std::net::Ipv4Addr;

pub const LINK_ETHERNET: u32 = 1;
pub const LINK_RAW: u32 = 101;
pub const LINK_SLL: u32 = 113;

pub const CLIENT: [u8; 4] = [192, 0, 2, 1];
pub const SERVER: [u8; 4] = [192, 0, 2, 53];

/// Builds a pcap file in either byte order.
pub struct PcapBuilder {
    buf: Vec<u8>,
    little: bool,
}

impl PcapBuilder {
    pub fn new(link: u32, little: bool) -> Self {
        let mut builder = Self {
            buf: Vec::new(),
            little,
        };
        builder.u32(0xA1B2_C3D4);
        builder.u16(2);
        builder.u16(4);
        builder.u32(0);
        builder.u32(0);
        builder.u32(65535);
        builder.u32(link);
        builder
    }

    fn u16(&mut self, v: u16) {
        let bytes = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    fn u32(&mut self, v: u32) {
        let bytes = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn frame(mut self, secs: u32, usec: u32, data: &[u8]) -> Self {
        self.u32(secs);
        self.u32(usec);
        self.u32(data.len() as u32);
        self.u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

pub fn ethernet(ip: &[u8]) -> Vec<u8> {
    let ethertype: u16 = if ip.first().is_some_and(|b| b >> 4 == 6) {
        0x86DD
    } else {
        0x0800
    };
    let mut frame = vec![0x02, 0, 0, 0, 0, 0x01, 0x02, 0, 0, 0, 0, 0x02];
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(ip);
    frame
}

pub fn vlan(ip: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x02, 0, 0, 0, 0, 0x01, 0x02, 0, 0, 0, 0, 0x02];
    frame.extend_from_slice(&0x8100u16.to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x0A]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());
    frame.extend_from_slice(ip);
    frame
}

pub fn sll(ip: &[u8]) -> Vec<u8> {
    let mut frame = vec![0, 0, 0, 1];
    frame.extend_from_slice(&6u16.to_be_bytes());
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01, 0, 0]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());
    frame.extend_from_slice(ip);
    frame
}

pub fn ipv4(src: [u8; 4], dst: [u8; 4], protocol: u8, id: u16, flags_offset: u16, payload: &[u8]) -> Vec<u8> {
    let total = (20 + payload.len()) as u16;
    let mut buf = vec![0x45, 0];
    buf.extend_from_slice(&total.to_be_bytes());
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&flags_offset.to_be_bytes());
    buf.extend_from_slice(&[64, protocol, 0, 0]);
    buf.extend_from_slice(&src);
    buf.extend_from_slice(&dst);
    buf.extend_from_slice(payload);
    buf
}

pub fn ipv6(src: [u8; 16], dst: [u8; 16], next: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x60, 0, 0, 0];
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(&[next, 64]);
    buf.extend_from_slice(&src);
    buf.extend_from_slice(&dst);
    buf.extend_from_slice(payload);
    buf
}

pub fn udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut seg = Vec::new();
    seg.extend_from_slice(&src_port.to_be_bytes());
    seg.extend_from_slice(&dst_port.to_be_bytes());
    seg.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    seg.extend_from_slice(&[0, 0]);
    seg.extend_from_slice(payload);
    seg
}

pub fn tcp(src_port: u16, dst_port: u16, seq: u32, flags: u16, payload: &[u8]) -> Vec<u8> {
    let mut seg = Vec::new();
    seg.extend_from_slice(&src_port.to_be_bytes());
    seg.extend_from_slice(&dst_port.to_be_bytes());
    seg.extend_from_slice(&seq.to_be_bytes());
    seg.extend_from_slice(&1u32.to_be_bytes());
    seg.extend_from_slice(&(0x5000 | flags).to_be_bytes());
    seg.extend_from_slice(&[0x20, 0x00, 0, 0, 0, 0]);
    seg.extend_from_slice(payload);
    seg
}

/// Prefixes a DNS message with its two-byte TCP length.
pub fn framed(message: &[u8]) -> Vec<u8> {
    let mut out = (message.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(message);
    out
}

pub fn query(id: u16, qname: &str, qtype: RecordType) -> Vec<u8> {
    let name: Name = qname.parse().unwrap();
    Message::query(id, Question::new(name, qtype, RecordClass::IN))
        .to_bytes()
        .unwrap()
}

pub fn response(id: u16, qname: &str, answers: u8) -> Vec<u8> {
    let name: Name = qname.parse().unwrap();
    let mut msg = Message::query(id, Question::new(name.clone(), RecordType::A, RecordClass::IN));
    msg.header.set_response(true);
    for last in 1..=answers {
        msg.add_answer(ResourceRecord::new(
            name.clone(),
            RecordType::A,
            RecordClass::IN,
            300,
            RData::A(A {
                address: Ipv4Addr::new(192, 0, 2, last),
            }),
        ));
    }
    msg.to_bytes().unwrap()
}
