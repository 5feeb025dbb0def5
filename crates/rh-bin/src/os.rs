use log::warn;

/// Pins the current process to `cpu` and raises its scheduling priority to
/// the maximum the running user is permitted. Both steps are best-effort:
/// a fuzzer running without `CAP_SYS_NICE` still works, just with more
/// timing jitter from the scheduler.
pub fn pin_and_boost(cpu: usize) {
    pin_to_cpu(cpu);
    boost_priority();
}

fn pin_to_cpu(cpu: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc != 0 {
            warn!("failed to pin process to CPU {}: {}", cpu, std::io::Error::last_os_error());
        }
    }
}

fn boost_priority() {
    unsafe {
        let rc = libc::setpriority(libc::PRIO_PROCESS, 0, -20);
        if rc != 0 {
            warn!(
                "failed to raise process priority (run as root or grant CAP_SYS_NICE): {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

/// Checks that `mount_point` is actually mounted as hugetlbfs.
pub fn check_hugetlbfs_mount(mount_point: &std::path::Path) -> anyhow::Result<()> {
    let mounts = std::fs::read_to_string("/proc/mounts")?;
    let mounted = mounts.lines().any(|line| {
        let mut fields = line.split_whitespace();
        let path = fields.next();
        let fstype = fields.nth(1);
        path == mount_point.to_str() && fstype == Some("hugetlbfs")
    });
    if !mounted {
        anyhow::bail!(
            "{} is not a mounted hugetlbfs filesystem; mount one before running",
            mount_point.display()
        );
    }
    Ok(())
}
