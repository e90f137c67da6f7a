use std::future::Future;

use super::model::book::Book;

/// 書誌データ供給の抽象。Infra層が実装する。
/// 取得失敗は実装側のフォールバックで吸収され、呼び出し側には現れない。
pub trait BookSource {
    fn generate(&self, count: usize) -> impl Future<Output = Vec<Book>> + Send;
}
