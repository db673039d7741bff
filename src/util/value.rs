use crate::proto::p4runtime::field_match::{self, FieldMatchType};
use byteorder::ByteOrder;
use bytes::Bytes;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A field match as supplied by the caller. The kind is sent as is; whether
/// it suits the field's declared match type is for the device to judge.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum MatchValue {
    Exact(Bytes),
    Ternary(Bytes, /*mask*/ Bytes),
    Lpm(Bytes, /*prefix_len*/ i32),
    Range(/*low*/ Bytes, /*high*/ Bytes),
    Optional(Bytes),
}

impl MatchValue {
    pub fn exact<T: Encode>(v: T) -> MatchValue {
        MatchValue::Exact(v.encode())
    }

    pub fn ternary<T: Encode>(v: T, mask: T) -> MatchValue {
        MatchValue::Ternary(v.encode(), mask.encode())
    }

    pub fn lpm<T: Encode>(v: T, prefix_len: i32) -> MatchValue {
        MatchValue::Lpm(v.encode(), prefix_len)
    }

    pub fn range<T: Encode>(low: T, high: T) -> MatchValue {
        MatchValue::Range(low.encode(), high.encode())
    }

    pub fn optional<T: Encode>(v: T) -> MatchValue {
        MatchValue::Optional(v.encode())
    }

    pub(crate) fn into_field_match_type(self) -> FieldMatchType {
        match self {
            MatchValue::Exact(value) => FieldMatchType::Exact(field_match::Exact { value }),
            MatchValue::Ternary(value, mask) => {
                FieldMatchType::Ternary(field_match::Ternary { value, mask })
            }
            MatchValue::Lpm(value, prefix_len) => {
                FieldMatchType::Lpm(field_match::Lpm { value, prefix_len })
            }
            MatchValue::Range(low, high) => FieldMatchType::Range(field_match::Range { low, high }),
            MatchValue::Optional(value) => {
                FieldMatchType::Optional(field_match::Optional { value })
            }
        }
    }
}

/// A 48-bit MAC address.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct MAC(pub [u8; 6]);

impl MAC {
    /// Parses `aa:bb:cc:dd:ee:ff`.
    pub fn of(s: &str) -> Option<MAC> {
        let raw = hex::decode(s.replace(':', "")).ok()?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> Option<MAC> {
        let mac: [u8; 6] = raw.try_into().ok()?;
        Some(MAC(mac))
    }

    pub fn broadcast() -> MAC {
        MAC([0xff; 6])
    }
}

impl std::fmt::Display for MAC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| hex::encode([*b])).collect();
        f.write_str(&parts.join(":"))
    }
}

pub trait Encode {
    fn encode(&self) -> Bytes;
}

impl Encode for Bytes {
    fn encode(&self) -> Bytes {
        self.clone()
    }
}

impl Encode for &[u8] {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl Encode for Vec<u8> {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl Encode for Ipv4Addr {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.octets())
    }
}

impl Encode for Ipv6Addr {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.octets())
    }
}

impl Encode for IpAddr {
    fn encode(&self) -> Bytes {
        match self {
            IpAddr::V4(ip) => ip.encode(),
            IpAddr::V6(ip) => ip.encode(),
        }
    }
}

impl Encode for MAC {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }
}

impl Encode for u64 {
    fn encode(&self) -> Bytes {
        let mut buf = [0u8; 8];
        byteorder::BigEndian::write_u64(&mut buf, *self);
        Bytes::copy_from_slice(&buf)
    }
}

impl Encode for u32 {
    fn encode(&self) -> Bytes {
        let mut buf = [0u8; 4];
        byteorder::BigEndian::write_u32(&mut buf, *self);
        Bytes::copy_from_slice(&buf)
    }
}

impl Encode for u16 {
    fn encode(&self) -> Bytes {
        let mut buf = [0u8; 2];
        byteorder::BigEndian::write_u16(&mut buf, *self);
        Bytes::copy_from_slice(&buf)
    }
}

impl Encode for u8 {
    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[*self])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_big_endian() {
        assert_eq!(0xABu16.encode().as_ref(), &[0x00, 0xAB]);
        assert_eq!(1u32.encode().as_ref(), &[0, 0, 0, 1]);
        assert_eq!(Ipv4Addr::new(10, 0, 0, 1).encode().as_ref(), &[10, 0, 0, 1]);
    }

    #[test]
    fn test_mac() {
        let mac = MAC::of("00:11:22:aa:bb:cc").unwrap();
        assert_eq!(mac.0, [0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
        assert!(MAC::of("00:11:22").is_none());
        assert!(MAC::of("zz:11:22:aa:bb:cc").is_none());
        assert_eq!(MAC::from_slice(&[0xff; 6]), Some(MAC::broadcast()));
        assert!(MAC::from_slice(&[0xff; 7]).is_none());
    }

    #[test]
    fn test_match_kind_passes_through() {
        let m = MatchValue::lpm(Ipv4Addr::new(10, 0, 0, 0), 8).into_field_match_type();
        match m {
            FieldMatchType::Lpm(lpm) => {
                assert_eq!(lpm.prefix_len, 8);
                assert_eq!(lpm.value.as_ref(), &[10, 0, 0, 0]);
            }
            other => panic!("unexpected {:?}", other),
        }
        let m = MatchValue::Exact(Bytes::from_static(&[0xAA])).into_field_match_type();
        assert_eq!(
            m,
            FieldMatchType::Exact(field_match::Exact {
                value: Bytes::from_static(&[0xAA])
            })
        );
    }
}
