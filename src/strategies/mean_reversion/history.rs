use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 按天追加写入的收盘价日志，每个成功的轮次写一行
#[derive(Debug, Clone)]
pub struct PriceLog {
    dir: PathBuf,
}

impl PriceLog {
    /// 创建日志目录，目录不可用时直接返回错误
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, now: &DateTime<Local>) -> PathBuf {
        self.dir.join(format!("{}.log", now.format("%Y-%m-%d")))
    }

    /// 写入一条价格，文件名在每次写入时按日期计算
    pub fn record(&self, price: f64) -> io::Result<()> {
        self.record_at(&Local::now(), price)
    }

    pub(super) fn record_at(&self, now: &DateTime<Local>, price: f64) -> io::Result<()> {
        let line = format!("{} {:.6}\n", now.format("%H:%M:%S"), price);
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(now))?;
        handle.write_all(line.as_bytes())
    }
}
