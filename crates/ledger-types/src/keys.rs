//! On-disk key layouts for the two column families.
//!
//! Both layouts are fixed-width and place the prefix-seek side first:
//! a prefix iteration over the first 16 bytes (tokens) or 33 bytes
//! (assets) visits exactly the records under a domain or an address, in
//! ascending order of the remaining bytes.

use crate::{
    Address, Name128, Symbol, TokenType, TypesError, TypesResult, ADDRESS_LEN, NAME128_LEN,
    SYMBOL_LEN,
};

/// Width of a token key: 16-byte prefix plus 16-byte key.
pub const TOKEN_KEY_LEN: usize = NAME128_LEN * 2;

/// Width of an asset key: 33-byte address plus 8-byte symbol.
pub const ASSET_KEY_LEN: usize = ADDRESS_LEN + SYMBOL_LEN;

/// A key in the token column family: `[prefix:16][key:16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenKey([u8; TOKEN_KEY_LEN]);

impl TokenKey {
    /// Build from an explicit prefix and key.
    pub fn new(prefix: Name128, key: Name128) -> Self {
        let mut buf = [0u8; TOKEN_KEY_LEN];
        buf[..NAME128_LEN].copy_from_slice(prefix.as_bytes());
        buf[NAME128_LEN..].copy_from_slice(key.as_bytes());
        TokenKey(buf)
    }

    /// Build the key for a record of `ty`.
    ///
    /// For [`TokenType::Token`] the domain must be supplied; every other
    /// token type has a fixed prefix and `domain` is ignored. The asset
    /// family does not use token keys.
    pub fn for_type(ty: TokenType, domain: Option<Name128>, key: Name128) -> TypesResult<Self> {
        match ty.prefix() {
            Some(prefix) => Ok(TokenKey::new(prefix, key)),
            None if ty == TokenType::Token => {
                let domain = domain.ok_or(TypesError::BadKeyType("token"))?;
                Ok(TokenKey::new(domain, key))
            }
            None => Err(TypesError::BadKeyType(ty.name())),
        }
    }

    /// The full 32-byte key.
    pub const fn as_bytes(&self) -> &[u8; TOKEN_KEY_LEN] {
        &self.0
    }

    /// The 16-byte prefix half.
    pub fn prefix(&self) -> Name128 {
        Name128::from_slice(&self.0[..NAME128_LEN]).unwrap_or_default()
    }

    /// The 16-byte key half.
    pub fn key(&self) -> Name128 {
        Name128::from_slice(&self.0[NAME128_LEN..]).unwrap_or_default()
    }

    /// Rebuild from a slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; TOKEN_KEY_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: TOKEN_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(TokenKey(arr))
    }
}

/// A key in the asset column family: `[address:33][symbol:8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetKey([u8; ASSET_KEY_LEN]);

impl AssetKey {
    /// Build from an address and a symbol.
    pub fn new(address: &Address, symbol: Symbol) -> Self {
        let mut buf = [0u8; ASSET_KEY_LEN];
        buf[..ADDRESS_LEN].copy_from_slice(&address.to_bytes());
        buf[ADDRESS_LEN..].copy_from_slice(&symbol.as_bytes());
        AssetKey(buf)
    }

    /// The full 41-byte key.
    pub const fn as_bytes(&self) -> &[u8; ASSET_KEY_LEN] {
        &self.0
    }

    /// The 33-byte address prefix used for per-address scans.
    pub fn address_prefix(address: &Address) -> [u8; ADDRESS_LEN] {
        address.to_bytes()
    }

    /// Decode the address half.
    pub fn address(&self) -> TypesResult<Address> {
        Address::from_slice(&self.0[..ADDRESS_LEN])
    }

    /// Decode the symbol half.
    pub fn symbol(&self) -> TypesResult<Symbol> {
        let arr: [u8; SYMBOL_LEN] = self.0[ADDRESS_LEN..].try_into().unwrap_or([0; SYMBOL_LEN]);
        Symbol::from_bytes(arr)
    }

    /// Rebuild from a slice of exactly 41 bytes.
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        let arr: [u8; ASSET_KEY_LEN] = bytes.try_into().map_err(|_| TypesError::BadLength {
            expected: ASSET_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(AssetKey(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PublicKey;

    #[test]
    fn test_token_key_layout() {
        let domain: Name128 = "evt".parse().unwrap();
        let key: Name128 = "t1".parse().unwrap();
        let tk = TokenKey::for_type(TokenType::Token, Some(domain), key).unwrap();
        assert_eq!(&tk.as_bytes()[..16], domain.as_bytes());
        assert_eq!(&tk.as_bytes()[16..], key.as_bytes());
        assert_eq!(tk.prefix(), domain);
        assert_eq!(tk.key(), key);
    }

    #[test]
    fn test_fixed_prefix_ignores_domain() {
        let key: Name128 = "d1".parse().unwrap();
        let a = TokenKey::for_type(TokenType::Domain, None, key).unwrap();
        let b = TokenKey::for_type(TokenType::Domain, Some("other".parse().unwrap()), key).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.prefix(), Name128::reserved(".domain"));
    }

    #[test]
    fn test_token_requires_domain() {
        let key: Name128 = "t1".parse().unwrap();
        assert!(TokenKey::for_type(TokenType::Token, None, key).is_err());
        assert!(TokenKey::for_type(TokenType::Asset, None, key).is_err());
    }

    #[test]
    fn test_asset_key_layout() {
        let mut key_bytes = [0x5au8; 33];
        key_bytes[0] = 0x02;
        let addr = Address::PublicKey(PublicKey(key_bytes));
        let sym = Symbol::new(5, 1).unwrap();
        let ak = AssetKey::new(&addr, sym);

        assert_eq!(&ak.as_bytes()[..33], &addr.to_bytes());
        assert_eq!(&ak.as_bytes()[33..], &sym.as_bytes());
        assert_eq!(ak.address().unwrap(), addr);
        assert_eq!(ak.symbol().unwrap(), sym);
    }

    #[test]
    fn test_keys_sort_by_prefix_first() {
        let d1: Name128 = "aaa".parse().unwrap();
        let d2: Name128 = "bbb".parse().unwrap();
        let hi: Name128 = "zzz".parse().unwrap();
        let lo: Name128 = "a".parse().unwrap();
        let k1 = TokenKey::new(d1, hi);
        let k2 = TokenKey::new(d2, lo);
        assert!(k1.as_bytes() < k2.as_bytes());
    }
}
