//! Panels for the metrics every Go program exports through client_golang's
//! Go and process collectors.

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::layout::{GroupOpts, PanelGroup, PanelRow, RowOpts};
use crate::panels::{stat, timeseries, DataSourceRef, Panel, PanelOpts, StatOpts, TimeSeriesOpts};
use crate::promql::{
    AggregationOp, CounterMetric, Function, GaugeMetric, MetricOpts, QueryOpts, RatioFunction,
    SummaryMetric, Target, TargetOpts,
};
use crate::units::Unit;

struct GoMetrics {
    goroutines: GaugeMetric,
    threads: GaugeMetric,
    info: GaugeMetric,
    gc_duration: SummaryMetric,
    alloc_bytes: GaugeMetric,
    alloc_bytes_total: CounterMetric,
    sys_bytes: GaugeMetric,
    lookups: CounterMetric,
    mallocs: CounterMetric,
    frees: CounterMetric,
    heap_alloc: GaugeMetric,
    heap_sys: GaugeMetric,
    heap_idle: GaugeMetric,
    heap_inuse: GaugeMetric,
    heap_released: GaugeMetric,
    heap_objects: GaugeMetric,
    stack_inuse: GaugeMetric,
    stack_sys: GaugeMetric,
    mspan_inuse: GaugeMetric,
    mspan_sys: GaugeMetric,
    mcache_inuse: GaugeMetric,
    mcache_sys: GaugeMetric,
    buck_hash_sys: GaugeMetric,
    gc_sys: GaugeMetric,
    other_sys: GaugeMetric,
    next_gc: GaugeMetric,
    cpu_seconds: CounterMetric,
    open_fds: GaugeMetric,
    max_fds: GaugeMetric,
    virtual_memory: GaugeMetric,
    virtual_memory_max: GaugeMetric,
    resident_memory: GaugeMetric,
    start_time: GaugeMetric,
}

fn gauge(name: &str, description: &str) -> GaugeMetric {
    GaugeMetric::new(name, MetricOpts::new().description(description))
}

fn counter(name: &str, description: &str) -> CounterMetric {
    CounterMetric::new(name, MetricOpts::new().description(description))
}

static GO: Lazy<GoMetrics> = Lazy::new(|| GoMetrics {
    goroutines: gauge("go_goroutines", "Number of goroutines that currently exist"),
    threads: gauge("go_threads", "Number of OS threads created"),
    info: GaugeMetric::new(
        "go_info",
        MetricOpts::new()
            .description("Information about the Go environment")
            .labels(["version"]),
    ),
    gc_duration: SummaryMetric::new(
        "go_gc_duration_seconds",
        MetricOpts::new().description("A summary of the pause duration of garbage collection cycles"),
    ),
    alloc_bytes: gauge("go_memstats_alloc_bytes", "Number of bytes allocated and still in use"),
    alloc_bytes_total: counter("go_memstats_alloc_bytes_total", "Total number of bytes allocated, even if freed"),
    sys_bytes: gauge("go_memstats_sys_bytes", "Number of bytes obtained from system"),
    lookups: counter("go_memstats_lookups_total", "Total number of pointer lookups"),
    mallocs: counter("go_memstats_mallocs_total", "Total number of mallocs"),
    frees: counter("go_memstats_frees_total", "Total number of frees"),
    heap_alloc: gauge("go_memstats_heap_alloc_bytes", "Number of heap bytes allocated and still in use"),
    heap_sys: gauge("go_memstats_heap_sys_bytes", "Number of heap bytes obtained from system"),
    heap_idle: gauge("go_memstats_heap_idle_bytes", "Number of heap bytes waiting to be used"),
    heap_inuse: gauge("go_memstats_heap_inuse_bytes", "Number of heap bytes that are in use"),
    heap_released: gauge("go_memstats_heap_released_bytes", "Number of heap bytes released to OS"),
    heap_objects: gauge("go_memstats_heap_objects", "Number of allocated objects"),
    stack_inuse: gauge("go_memstats_stack_inuse_bytes", "Number of bytes in use by the stack allocator"),
    stack_sys: gauge("go_memstats_stack_sys_bytes", "Number of bytes obtained from system for stack allocator"),
    mspan_inuse: gauge("go_memstats_mspan_inuse_bytes", "Number of bytes in use by mspan structures"),
    mspan_sys: gauge("go_memstats_mspan_sys_bytes", "Number of bytes used for mspan structures obtained from system"),
    mcache_inuse: gauge("go_memstats_mcache_inuse_bytes", "Number of bytes in use by mcache structures"),
    mcache_sys: gauge("go_memstats_mcache_sys_bytes", "Number of bytes used for mcache structures obtained from system"),
    buck_hash_sys: gauge("go_memstats_buck_hash_sys_bytes", "Number of bytes used by the profiling bucket hash table"),
    gc_sys: gauge("go_memstats_gc_sys_bytes", "Number of bytes used for garbage collection system metadata"),
    other_sys: gauge("go_memstats_other_sys_bytes", "Number of bytes used for other system allocations"),
    next_gc: gauge("go_memstats_next_gc_bytes", "Number of heap bytes when next garbage collection will take place"),
    cpu_seconds: counter("process_cpu_seconds_total", "Total user and system CPU time spent in seconds"),
    open_fds: gauge("process_open_fds", "Number of open file descriptors"),
    max_fds: gauge("process_max_fds", "Maximum number of open file descriptors"),
    virtual_memory: gauge("process_virtual_memory_bytes", "Virtual memory size in bytes"),
    virtual_memory_max: gauge(
        "process_virtual_memory_max_bytes",
        "Maximum amount of virtual memory available in bytes",
    ),
    resident_memory: gauge("process_resident_memory_bytes", "Resident memory size in bytes"),
    start_time: gauge("process_start_time_seconds", "Start time of the process since unix epoch in seconds"),
});

#[derive(Debug, Clone, PartialEq)]
pub struct GoRuntimeOpts {
    pub title: String,
    pub datasource: Option<DataSourceRef>,
    /// Name of an application build-info gauge carrying branch/revision labels
    pub build_info_metric: Option<String>,
    pub selectors: Vec<String>,
    pub group_by: Vec<String>,
    pub collapsed: bool,
}

impl Default for GoRuntimeOpts {
    fn default() -> Self {
        Self {
            title: "Go Runtime Metrics".to_string(),
            datasource: None,
            build_info_metric: None,
            selectors: Vec::new(),
            group_by: vec!["pod".to_string(), "instance".to_string()],
            collapsed: false,
        }
    }
}

fn series(title: &str, unit: Option<Unit>, targets: Vec<Target>) -> Panel {
    let mut opts = PanelOpts::new(title).targets(targets);
    opts.unit = unit;
    timeseries(opts, TimeSeriesOpts::default())
}

fn legend(legend: &str) -> TargetOpts {
    TargetOpts::default().legend(legend)
}

/// Go runtime and process panels as one group.
pub fn go_runtime_panels(opts: &GoRuntimeOpts) -> Result<PanelGroup> {
    let go = &*GO;
    let sel = QueryOpts::new().selectors(opts.selectors.iter().cloned());
    let grouped = sel.clone().group_by(opts.group_by.iter().cloned());
    let instant = sel.clone().instant();
    let row = |height: u32| {
        let mut row = RowOpts::new().height(height);
        row.datasource = opts.datasource.clone();
        row
    };
    let avg = |metric: &GaugeMetric, name: &str| -> Result<Target> {
        Ok(metric.calc(Some(AggregationOp::Avg), &sel)?.target_with(legend(name)))
    };

    let build_info = match &opts.build_info_metric {
        Some(name) => {
            let labels = ["branch", "goarch", "goos", "goversion", "revision", "tags", "version"];
            let query = GaugeMetric::new(name.as_str(), MetricOpts::new())
                .calc(Some(AggregationOp::Sum), &instant.clone().group_by(labels))?;
            Some(stat(
                PanelOpts::new("Go Build Info").width(6).target(query.target()),
                StatOpts::default()
                    .reduce_fields("/^(branch|goarch|goos|goversion|revision|tags|version)$/")
                    .orientation("horizontal")
                    .text_title_size(12),
            ))
        }
        None => None,
    };

    let summary_rows = vec![
        PanelRow::new(
            row(3),
            vec![
                stat(
                    PanelOpts::new("Go Version").target(
                        go.info
                            .calc(Some(AggregationOp::Sum), &instant.clone().group_by(["version"]))?
                            .target(),
                    ),
                    StatOpts::default().reduce_fields("/^version$/"),
                ),
                stat(
                    PanelOpts::new("Process Start Time")
                        .unit(Unit::DateTimeFromNow)
                        .target(go.start_time.calc(Some(AggregationOp::Max), &instant.clone().append(" * 1000"))?.target()),
                    StatOpts::default(),
                ),
                stat(
                    PanelOpts::new("Process Max File Descriptors")
                        .unit(Unit::Short)
                        .target(go.max_fds.calc(Some(AggregationOp::Min), &instant)?.target()),
                    StatOpts::default(),
                ),
                stat(
                    PanelOpts::new("Process Virtual Memory Max")
                        .unit(Unit::BytesSi)
                        .target(go.virtual_memory_max.calc(Some(AggregationOp::Min), &instant)?.target()),
                    StatOpts::default(),
                ),
            ],
        ),
        PanelRow::new(
            row(8),
            vec![
                build_info,
                Some(series(
                    "Process Open File Descriptors",
                    Some(Unit::Short),
                    vec![go.open_fds.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                )),
                Some(series(
                    "Threads",
                    None,
                    vec![go.threads.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                )),
                Some(series(
                    "Goroutines",
                    None,
                    vec![go.goroutines.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                )),
            ],
        ),
    ];

    let memory_rows = vec![
        PanelRow::new(
            row(8),
            vec![
                series(
                    "CPU Usage",
                    Some(Unit::Short),
                    vec![go.cpu_seconds.rate(&grouped)?.target()],
                ),
                series(
                    "Memory Usage",
                    Some(Unit::BytesSi),
                    vec![go.resident_memory.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                ),
                series(
                    "Go Alloc Rate",
                    Some(Unit::BytesPerSecondSi),
                    vec![go.alloc_bytes_total.rate(&grouped)?.target()],
                ),
                series(
                    "Go Alloc Bytes",
                    Some(Unit::BytesSi),
                    vec![go.alloc_bytes.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                ),
            ],
        ),
        PanelRow::new(
            row(8),
            vec![
                series(
                    "Stack Memory Usage (avg)",
                    Some(Unit::BytesSi),
                    vec![avg(&go.stack_sys, "sys")?, avg(&go.stack_inuse, "inuse")?],
                ),
                series(
                    "Heap Memory Usage (avg)",
                    Some(Unit::BytesSi),
                    vec![
                        avg(&go.heap_sys, "sys")?,
                        avg(&go.heap_idle, "idle")?,
                        avg(&go.heap_released, "released")?,
                        avg(&go.heap_inuse, "inuse")?,
                        avg(&go.heap_alloc, "alloc")?,
                    ],
                ),
                series(
                    "Heap Objects",
                    Some(Unit::Short),
                    vec![go.heap_objects.calc(Some(AggregationOp::Avg), &grouped)?.target()],
                ),
                series(
                    "Other Memory (avg)",
                    Some(Unit::BytesSi),
                    vec![
                        avg(&go.mspan_sys, "mspan_sys")?,
                        avg(&go.mspan_inuse, "mspan_inuse")?,
                        avg(&go.mcache_sys, "mcache_sys")?,
                        avg(&go.mcache_inuse, "mcache_inuse")?,
                        avg(&go.buck_hash_sys, "buck_hash_sys")?,
                        avg(&go.other_sys, "other_sys")?,
                        avg(&go.gc_sys, "gc_sys")?,
                        avg(&go.next_gc, "next_gc")?,
                        avg(&go.sys_bytes, "sys")?,
                    ],
                ),
            ],
        ),
    ];

    let gc_rows = vec![
        PanelRow::new(
            row(8),
            vec![
                series(
                    "Go GC count",
                    None,
                    vec![go.gc_duration.count().increase(&grouped)?.target()],
                ),
                series(
                    "Go GC Duration Seconds (rate)",
                    Some(Unit::Seconds),
                    vec![go.gc_duration.sum().rate(&grouped)?.target()],
                ),
                series(
                    "Go GC Duration Seconds (avg)",
                    Some(Unit::Seconds),
                    vec![go.gc_duration.avg(&grouped, RatioFunction::Rate)?.target()],
                ),
            ],
        ),
        PanelRow::new(
            row(8),
            vec![
                series(
                    "Lookups rate",
                    Some(Unit::Short),
                    vec![go.lookups.calc(AggregationOp::Sum, Function::Rate, &grouped)?.target()],
                ),
                series(
                    "Mallocs rate",
                    Some(Unit::Short),
                    vec![go.mallocs.rate(&grouped)?.target()],
                ),
                series(
                    "Frees rate",
                    Some(Unit::Short),
                    vec![go.frees.rate(&grouped)?.target()],
                ),
                series(
                    "Process Virtual Memory",
                    Some(Unit::BytesSi),
                    vec![go.virtual_memory.calc(Some(AggregationOp::Sum), &grouped)?.target()],
                ),
            ],
        ),
    ];

    let rows = summary_rows.into_iter().chain(memory_rows).chain(gc_rows);
    Ok(PanelGroup::new(
        GroupOpts::new(opts.title.clone()).collapsed(opts.collapsed),
        rows,
    ))
}
