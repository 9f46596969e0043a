//! 采集编排
//!
//! 一次外部拉取触发一轮采集：为每个设备启动一个独立任务调用 `status`，
//! 等待全部任务结束后汇总结果。单个设备失败只影响自身结果：
//! 记录失败、累加该设备错误计数、置位本轮错误标记，不取消也不阻塞其他设备。
//!
//! - 并发度由信号量限制，避免设备列表过长时耗尽文件描述符
//! - 多个拉取请求重叠时按轮次串行执行
//! - 轮内不重试，失败设备下一轮重新采集

use domain::{Device, Telemetry};
use plug_protocol::{CryptoError, DeviceClient, ProtocolError, StatusSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

/// 编排参数
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 单轮内同时进行的设备交互上限
    pub max_concurrency: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
        }
    }
}

impl CollectorConfig {
    fn sanitized(mut self) -> Self {
        if self.max_concurrency == 0 {
            self.max_concurrency = 1;
        }
        self
    }
}

/// 单个设备在本轮的结果
#[derive(Debug)]
pub struct DeviceOutcome {
    pub name: String,
    pub result: Result<Telemetry, ProtocolError>,
    /// 本次交互耗时
    pub duration: Duration,
    /// 该设备自进程启动以来的失败次数
    pub errors_total: u64,
}

impl DeviceOutcome {
    pub fn telemetry(&self) -> Option<&Telemetry> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ProtocolError> {
        self.result.as_ref().err()
    }
}

/// 单轮采集汇总，按配置顺序排列
#[derive(Debug)]
pub struct CollectionReport {
    /// 轮次序号（从 1 开始）
    pub cycle: u64,
    pub outcomes: Vec<DeviceOutcome>,
    /// 本轮是否至少有一个设备失败
    pub had_error: bool,
    pub elapsed: Duration,
}

impl CollectionReport {
    pub fn outcome(&self, name: &str) -> Option<&DeviceOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name == name)
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }
}

struct DeviceSlot {
    name: String,
    /// 密钥在构造时校验一次，非法密钥的设备每轮都以同一加密错误失败
    source: Result<Arc<dyn StatusSource>, CryptoError>,
    errors: AtomicU64,
}

struct CollectorInner {
    slots: Vec<Arc<DeviceSlot>>,
    limiter: Arc<Semaphore>,
    cycle_lock: Mutex<()>,
    last_cycle_failed: AtomicBool,
    cycles: AtomicU64,
}

/// 采集编排器
#[derive(Clone)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

impl Collector {
    pub fn new(devices: &[Device]) -> Self {
        Self::with_config(devices, CollectorConfig::default())
    }

    /// 为每个设备创建协议客户端
    pub fn with_config(devices: &[Device], config: CollectorConfig) -> Self {
        let slots = devices
            .iter()
            .map(|device| {
                let source = match DeviceClient::new(device) {
                    Ok(client) => Ok(Arc::new(client) as Arc<dyn StatusSource>),
                    Err(err) => {
                        warn!(
                            device = %device.name,
                            error = %err,
                            "device key rejected, every poll of this device will fail"
                        );
                        Err(err)
                    }
                };
                (device.name.clone(), source)
            })
            .collect();
        Self::from_slots(slots, config)
    }

    /// 使用自定义遥测来源（模拟设备、测试桩）
    pub fn from_sources(
        sources: Vec<(String, Arc<dyn StatusSource>)>,
        config: CollectorConfig,
    ) -> Self {
        let slots = sources
            .into_iter()
            .map(|(name, source)| (name, Ok(source)))
            .collect();
        Self::from_slots(slots, config)
    }

    fn from_slots(
        slots: Vec<(String, Result<Arc<dyn StatusSource>, CryptoError>)>,
        config: CollectorConfig,
    ) -> Self {
        let config = config.sanitized();
        let slots = slots
            .into_iter()
            .map(|(name, source)| {
                Arc::new(DeviceSlot {
                    name,
                    source,
                    errors: AtomicU64::new(0),
                })
            })
            .collect();
        Self {
            inner: Arc::new(CollectorInner {
                slots,
                limiter: Arc::new(Semaphore::new(config.max_concurrency)),
                cycle_lock: Mutex::new(()),
                last_cycle_failed: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.inner.slots.iter().map(|slot| slot.name.as_str())
    }

    /// 最近一轮是否有设备失败
    pub fn last_cycle_failed(&self) -> bool {
        self.inner.last_cycle_failed.load(Ordering::SeqCst)
    }

    pub fn cycles_total(&self) -> u64 {
        self.inner.cycles.load(Ordering::Relaxed)
    }

    /// 执行一轮采集
    pub async fn collect(&self) -> CollectionReport {
        self.collect_with(|_| {}).await
    }

    /// 执行一轮采集，并在持有轮次锁期间把汇总交给 `apply`
    ///
    /// 整轮在独立任务中运行：调用方中途放弃时，本轮仍会完成计数、
    /// 错误标记与 `apply`，下一轮在本轮结束后才开始。
    pub async fn collect_with<F>(&self, apply: F) -> CollectionReport
    where
        F: FnOnce(&CollectionReport) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(inner.run_cycle(apply)).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "collection cycle task failed");
                self.inner.last_cycle_failed.store(true, Ordering::SeqCst);
                let outcomes = self
                    .inner
                    .slots
                    .iter()
                    .map(|slot| DeviceOutcome {
                        name: slot.name.clone(),
                        result: Err(ProtocolError::Task(err.to_string())),
                        duration: Duration::ZERO,
                        errors_total: slot.errors.load(Ordering::Relaxed),
                    })
                    .collect();
                CollectionReport {
                    cycle: self.cycles_total(),
                    outcomes,
                    had_error: true,
                    elapsed: Duration::ZERO,
                }
            }
        }
    }
}

impl CollectorInner {
    /// 错误标记在任何设备任务启动前清零；所有任务结束后才释放轮次锁。
    async fn run_cycle<F>(self: Arc<Self>, apply: F) -> CollectionReport
    where
        F: FnOnce(&CollectionReport) + Send + 'static,
    {
        let _cycle_guard = self.cycle_lock.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_cycle_failed.store(false, Ordering::SeqCst);
        let started_at = Instant::now();

        let handles: Vec<_> = self
            .slots
            .iter()
            .map(|slot| {
                let slot = Arc::clone(slot);
                let limiter = Arc::clone(&self.limiter);
                tokio::spawn(async move { poll_device(&slot, &limiter).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (slot, handle) in self.slots.iter().zip(handles) {
            let (result, duration) = match handle.await {
                Ok(polled) => polled,
                Err(err) => (Err(ProtocolError::Task(err.to_string())), Duration::ZERO),
            };

            let errors_total = match &result {
                Ok(_) => slot.errors.load(Ordering::Relaxed),
                Err(err) => {
                    self.last_cycle_failed.store(true, Ordering::SeqCst);
                    warn!(
                        device = %slot.name,
                        kind = err.kind().as_str(),
                        error = %err,
                        "error during scrape"
                    );
                    slot.errors.fetch_add(1, Ordering::Relaxed) + 1
                }
            };

            outcomes.push(DeviceOutcome {
                name: slot.name.clone(),
                result,
                duration,
                errors_total,
            });
        }

        let report = CollectionReport {
            cycle,
            had_error: outcomes.iter().any(|outcome| outcome.result.is_err()),
            outcomes,
            elapsed: started_at.elapsed(),
        };
        info!(
            cycle = report.cycle,
            devices = report.outcomes.len(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "collection cycle complete"
        );
        apply(&report);
        report
    }
}

async fn poll_device(
    slot: &DeviceSlot,
    limiter: &Semaphore,
) -> (Result<Telemetry, ProtocolError>, Duration) {
    let _permit = match limiter.acquire().await {
        Ok(permit) => permit,
        Err(err) => return (Err(ProtocolError::Task(err.to_string())), Duration::ZERO),
    };
    let started_at = Instant::now();
    let result = match &slot.source {
        Ok(source) => source.status().await,
        Err(err) => Err(ProtocolError::Crypto(err.clone())),
    };
    (result, started_at.elapsed())
}
