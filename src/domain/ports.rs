use crate::domain::model::{CategoryMode, ExtractResult, SourceDescriptor, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 回傳 path 在此儲存體中的完整位置
    fn location_of(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn sources(&self) -> &[SourceDescriptor];
    fn output_path(&self) -> &str;
    fn output_file(&self) -> &str;
    fn report_file(&self) -> Option<&str>;
    fn fetch_timeout(&self) -> Duration;
    fn probe_timeout(&self) -> Duration;
    fn max_concurrent_probes(&self) -> usize;
    fn user_agent(&self) -> &str;
    fn category_mode(&self) -> CategoryMode;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// 下載並解析所有來源
    async fn extract(&self) -> Result<ExtractResult>;
    /// 驗證、去重、分組並產生輸出文字
    async fn transform(&self, extracted: ExtractResult) -> Result<TransformResult>;
    /// 寫出播放清單，回傳輸出位置
    async fn load(&self, result: &TransformResult) -> Result<String>;
}
