//! basE91 encoding
//!
//! Only the encoder is needed: the coordinator receives the token hash in
//! this dense alphabet and we never have to read one back.

const ALPHABET: &[u8; 91] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,./:;<=>?@[]^_`{|}~\"";

pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 16 / 13 + 2);
    let mut queue: u32 = 0;
    let mut bits: u32 = 0;

    for byte in data {
        queue |= (*byte as u32) << bits;
        bits += 8;
        if bits > 13 {
            let mut value = queue & 8191;
            if value > 88 {
                queue >>= 13;
                bits -= 13;
            } else {
                value = queue & 16383;
                queue >>= 14;
                bits -= 14;
            }
            out.push(ALPHABET[(value % 91) as usize] as char);
            out.push(ALPHABET[(value / 91) as usize] as char);
        }
    }

    if bits > 0 {
        out.push(ALPHABET[(queue % 91) as usize] as char);
        if bits > 7 || queue > 90 {
            out.push(ALPHABET[(queue / 91) as usize] as char);
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"test"), "fPNKd");
        assert_eq!(encode(b"Hello, world!"), ">OwJh>}A\"=r@@Y?F");
    }

    #[test]
    fn test_output_is_denser_than_hex() {
        let data = [0xabu8; 32];
        let encoded = encode(&data);
        assert!(encoded.len() < hex::encode(data).len());
        assert!(encoded.bytes().all(|c| ALPHABET.contains(&c)));
    }
}
