use rand::Rng;
use uuid::Uuid;

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// 生成会员福利码：128 位随机 UUID（无分隔符的十六进制）加 6 位随机字母数字后缀。
///
/// The result is URL-safe and can be embedded in a query string as-is.
pub fn generate_benefit_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect();
    format!("{}{}", Uuid::new_v4().simple(), suffix)
}
