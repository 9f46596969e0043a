//! AES-128 分组加解密
//!
//! 设备固件以 ECB 方式逐块处理数据：无初始向量、块间无链接，
//! 每个 16 字节分组使用同一密钥调度独立加解密。
//!
//! 填充采用长度前缀约定：追加 `16 - len % 16` 个值为该长度的字节，
//! 长度恰为 16 的整数倍时追加一个完整分组（16 个 0x10）。

use crate::error::CryptoError;
use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use std::fmt;

/// 分组长度（字节）
pub const BLOCK_SIZE: usize = 16;

/// 密钥长度（字节）
pub const KEY_SIZE: usize = 16;

/// 绑定单个设备密钥的分组密码
#[derive(Clone)]
pub struct Cipher {
    inner: Aes128,
}

impl Cipher {
    /// 校验密钥长度并完成密钥调度
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::KeySize(key.len()));
        }
        let inner = Aes128::new_from_slice(key).map_err(|_| CryptoError::KeySize(key.len()))?;
        Ok(Self { inner })
    }

    /// 逐块加密，输入长度必须是 16 的整数倍
    pub fn encrypt_blocks(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        ensure_block_aligned(plaintext)?;
        let mut out = plaintext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(out)
    }

    /// 逐块解密，输入长度必须是 16 的整数倍
    pub fn decrypt_blocks(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        ensure_block_aligned(ciphertext)?;
        let mut out = ciphertext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(out)
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cipher { .. }")
    }
}

fn ensure_block_aligned(data: &[u8]) -> Result<(), CryptoError> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockSize(data.len()));
    }
    Ok(())
}

/// 追加长度前缀填充，结果长度总是 16 的整数倍且至少多出 1 字节
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// 去除填充：读取末字节 N 并截掉末尾 N 字节
pub fn unpad(data: &[u8]) -> Result<&[u8], CryptoError> {
    let Some(&last) = data.last() else {
        return Err(CryptoError::Padding("empty buffer".to_string()));
    };
    let pad_len = usize::from(last);
    if pad_len == 0 {
        return Err(CryptoError::Padding("pad length is zero".to_string()));
    }
    if pad_len > data.len() {
        return Err(CryptoError::Padding(format!(
            "pad length {} exceeds buffer length {}",
            pad_len,
            data.len()
        )));
    }
    Ok(&data[..data.len() - pad_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_known_answer() {
        // FIPS-197 附录 C.1
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let cipher = Cipher::new(&key).unwrap();

        let encrypted = cipher.encrypt_blocks(&plaintext).unwrap();
        assert_eq!(hex::encode(&encrypted), "69c4e0d86a7b0430d8cdb78070b4c55a");
        assert_eq!(cipher.decrypt_blocks(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_blocks_are_independent() {
        let cipher = Cipher::new(KEY).unwrap();
        let block = [0x42u8; BLOCK_SIZE];
        let mut two = block.to_vec();
        two.extend_from_slice(&block);

        let encrypted = cipher.encrypt_blocks(&two).unwrap();
        assert_eq!(encrypted[..BLOCK_SIZE], encrypted[BLOCK_SIZE..]);
    }

    #[test]
    fn test_encrypt_decrypt_padded() {
        let cipher = Cipher::new(KEY).unwrap();
        for len in 0..=48 {
            let plaintext: Vec<u8> = (0..len as u8).collect();
            let padded = pad(&plaintext);
            let encrypted = cipher.encrypt_blocks(&padded).unwrap();
            assert_ne!(encrypted, padded);
            assert_eq!(cipher.decrypt_blocks(&encrypted).unwrap(), padded);
            assert_eq!(unpad(&padded).unwrap(), plaintext.as_slice());
        }
    }

    #[test]
    fn test_pad_full_block() {
        let padded = pad(&[7u8; 32]);
        assert_eq!(padded.len(), 48);
        assert!(padded[32..].iter().all(|&b| b == 16));

        let padded = pad(b"abc");
        assert_eq!(padded.len(), 16);
        assert!(padded[3..].iter().all(|&b| b == 13));
    }

    #[test]
    fn test_key_size() {
        assert_eq!(Cipher::new(b"short").unwrap_err(), CryptoError::KeySize(5));
        assert_eq!(
            Cipher::new(b"0123456789abcdef0").unwrap_err(),
            CryptoError::KeySize(17)
        );
    }

    #[test]
    fn test_unaligned_input() {
        let cipher = Cipher::new(KEY).unwrap();
        assert_eq!(
            cipher.encrypt_blocks(&[0u8; 15]).unwrap_err(),
            CryptoError::BlockSize(15)
        );
        assert_eq!(
            cipher.decrypt_blocks(&[0u8; 17]).unwrap_err(),
            CryptoError::BlockSize(17)
        );
    }

    #[test]
    fn test_unpad_rejects_invalid() {
        assert!(matches!(unpad(&[]), Err(CryptoError::Padding(_))));
        assert!(matches!(unpad(&[1, 2, 0]), Err(CryptoError::Padding(_))));
        assert!(matches!(unpad(&[1, 2, 4]), Err(CryptoError::Padding(_))));
        assert_eq!(unpad(&[3, 3, 3]).unwrap(), &[] as &[u8]);
    }
}
