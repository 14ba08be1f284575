//! `init`'s four parameters (§4.7), validated up front and reduced to exact table/cache
//! sizes before the manager ever touches an allocator.

use crate::error::Error;

/// Smallest unique table big enough to hold the two reserved terminal slots plus room to
/// work; below this GC would thrash on essentially every insert.
const MIN_TABLE_CAPACITY_LOG2: u32 = 8;
const MAX_TABLE_CAPACITY_LOG2: u32 = 40;
const MIN_CACHE_CAPACITY_LOG2: u32 = 4;
const MAX_CACHE_CAPACITY_LOG2: u32 = 32;

#[derive(Copy, Clone, Debug)]
pub struct Config {
    pub(crate) table_capacity_log2: u32,
    pub(crate) cache_capacity_log2: u32,
    pub(crate) worker_count: usize,
    pub(crate) granularity: u32,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::default().build().expect("default configuration is always valid")
    }
}

/// Builder for [`Config`], mirroring the shape of `sylvan_init_package`'s four arguments:
/// initial unique table size, initial operation cache size, worker count (0 =
/// autodetect), and cache granularity.
#[derive(Copy, Clone, Debug)]
pub struct ConfigBuilder {
    table_capacity_log2: u32,
    cache_capacity_log2: u32,
    worker_count: usize,
    granularity: u32,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            table_capacity_log2: 24,
            cache_capacity_log2: 20,
            worker_count: 0,
            granularity: 4,
        }
    }
}

impl ConfigBuilder {
    /// Log2 of the unique table's fixed slot count. Valid range: 8..=40.
    pub fn table_capacity_log2(mut self, value: u32) -> Self {
        self.table_capacity_log2 = value;
        self
    }

    /// Log2 of the operation cache's fixed line count. Valid range: 4..=32.
    pub fn cache_capacity_log2(mut self, value: u32) -> Self {
        self.cache_capacity_log2 = value;
        self
    }

    /// Number of worker threads. `0` autodetects via
    /// `std::thread::available_parallelism`.
    pub fn worker_count(mut self, value: usize) -> Self {
        self.worker_count = value;
        self
    }

    /// Cache-probe granularity (§4.6): operations only consult/populate the cache once
    /// every `granularity` recursion levels. Must be at least 1.
    pub fn granularity(mut self, value: u32) -> Self {
        self.granularity = value;
        self
    }

    pub fn build(self) -> Result<Config, Error> {
        if !(MIN_TABLE_CAPACITY_LOG2..=MAX_TABLE_CAPACITY_LOG2).contains(&self.table_capacity_log2) {
            return Err(Error::InitError(format!(
                "table_capacity_log2 must be between {} and {}, got {}",
                MIN_TABLE_CAPACITY_LOG2, MAX_TABLE_CAPACITY_LOG2, self.table_capacity_log2
            )));
        }
        if !(MIN_CACHE_CAPACITY_LOG2..=MAX_CACHE_CAPACITY_LOG2).contains(&self.cache_capacity_log2) {
            return Err(Error::InitError(format!(
                "cache_capacity_log2 must be between {} and {}, got {}",
                MIN_CACHE_CAPACITY_LOG2, MAX_CACHE_CAPACITY_LOG2, self.cache_capacity_log2
            )));
        }
        if self.granularity == 0 {
            return Err(Error::InitError("granularity must be at least 1".to_string()));
        }
        Ok(Config {
            table_capacity_log2: self.table_capacity_log2,
            cache_capacity_log2: self.cache_capacity_log2,
            worker_count: self.worker_count,
            granularity: self.granularity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ConfigBuilder::default().build().is_ok());
    }

    #[test]
    fn out_of_range_table_capacity_is_rejected() {
        let result = Config::builder().table_capacity_log2(2).build();
        assert!(matches!(result, Err(Error::InitError(_))));
    }

    #[test]
    fn zero_granularity_is_rejected() {
        let result = Config::builder().granularity(0).build();
        assert!(matches!(result, Err(Error::InitError(_))));
    }
}
