//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states captured from
//! a 4-CPU laptop.

use std::fmt::Write;

use super::filesystem::MockFs;
use crate::stats::Stats;

/// `/proc/interrupts` of a 4-CPU x86 machine.
pub const TYPICAL_INTERRUPTS: &str = "            CPU0       CPU1       CPU2       CPU3
   0:         13          0          0          0  IR-IO-APIC    2-edge      timer
   1:          0         21          0          0  IR-IO-APIC    1-edge      i8042
   8:          0          0          1          0  IR-IO-APIC    8-edge      rtc0
   9:          0       8564          0          0  IR-IO-APIC    9-fasteoi   acpi
  12:          0          0          0        713  IR-IO-APIC   12-edge      i8042
  16:          0          0        227          0  IR-IO-APIC   16-fasteoi   i801_smbus
 120:          0          0          0          0  DMAR-MSI    0-edge      dmar0
 121:          0          0          0          0  DMAR-MSI    1-edge      dmar1
 125:          0          0   12356620          0  IR-PCI-MSI 327680-edge      xhci_hcd
 126:          0          0          0         24  IR-PCI-MSI 31457280-edge      nvme0q0
 127:     107368          0          0          0  IR-PCI-MSI 31457281-edge      nvme0q1
 128:          0     107768          0          0  IR-PCI-MSI 31457282-edge      nvme0q2
 129:          0          0     108890          0  IR-PCI-MSI 31457283-edge      nvme0q3
 130:          0          0          0     100886  IR-PCI-MSI 31457284-edge      nvme0q4
 131:    3949116          0          0          0  IR-PCI-MSI 520192-edge      enp0s31f6
 132:          0    6707981          0          0  IR-PCI-MSI 32768-edge      i915
 133:          0          0          0         77  IR-PCI-MSI 360448-edge      mei_me
 134:         47          0          0          0  IR-PCI-MSI 30408704-edge      iwlwifi
 135:          0       1859          0          0  IR-PCI-MSI 514048-edge      snd_hda_intel:card1
 136:          0          0         21          0     dummy   44  rmi4_smbus
 137:          0          0          0          0      rmi4    0  rmi4-00.fn34
 138:          0          0          0          0      rmi4    1  rmi4-00.fn01
 139:          0         21          0          0      rmi4    2  rmi4-00.fn03
 140:          0          0          0          0      rmi4    3  rmi4-00.fn11
 141:          0          0          0          0      rmi4    4  rmi4-00.fn11
 142:          0          0          0          0      rmi4    5  rmi4-00.fn30
 NMI:        416        405        423        421   Non-maskable interrupts
 LOC:   14926901   16283403   14699417   15519974   Local timer interrupts
 SPU:          0          0          0          0   Spurious interrupts
 PMI:        416        405        423        421   Performance monitoring interrupts
 IWI:     131421    2522925     150274     139737   IRQ work interrupts
 RTR:          0          0          0          0   APIC ICR read retries
 RES:    2384009    1628159    2313879    1735030   Rescheduling interrupts
 CAL:    1910273    1713508    1870416    1758259   Function call interrupts
 TLB:    2231123    2225305    2305323    2335869   TLB shootdowns
 TRM:      39489      39489      39489      39489   Thermal event interrupts
 THR:          0          0          0          0   Threshold APIC interrupts
 DFR:          0          0          0          0   Deferred Error APIC interrupts
 MCE:          0          0          0          0   Machine check exceptions
 MCP:         61         62         62         62   Machine check polls
 ERR:          0
 MIS:          0
 PIN:          0          0          0          0   Posted-interrupt notification event
 NPI:          0          0          0          0   Nested posted-interrupt event
 PIW:          0          0          0          0   Posted-interrupt wakeup event
";

/// `/proc/softirqs` of the same machine.
pub const TYPICAL_SOFTIRQS: &str = "                    CPU0       CPU1       CPU2       CPU3
          HI:       3853     390251      75886       3513
       TIMER:     128764     200838     129415     129834
      NET_TX:         10          2       1282          3
      NET_RX:     162388         32          9         19
       BLOCK:       1083        482       1319        802
    IRQ_POLL:          0          0          0          0
     TASKLET:        626        118      33417         11
       SCHED:     424448     466847     406115     349634
     HRTIMER:          0          0          0          0
         RCU:     258340     286465     252164     250633
";

impl MockFs {
    /// Creates a typical 4-CPU system: interrupt and softirq tables, a few
    /// IRQ directories, one process with two threads, and the sysfs online mask.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/interrupts", TYPICAL_INTERRUPTS);
        fs.add_file("/proc/softirqs", TYPICAL_SOFTIRQS);

        fs.add_file("/proc/irq/default_smp_affinity", "f\n");
        fs.add_irq(0, "0-3", Some("0"), Some("timer"));
        fs.add_irq(9, "0-3", Some("1"), Some("acpi"));
        fs.add_irq(125, "2", Some("2"), Some("xhci_hcd"));
        fs.add_irq(131, "0-1", Some("0"), Some("enp0s31f6"));
        // Registered with the kernel but never fired, so no counter row.
        fs.add_irq(145, "3,7", None, Some("xhci_hcd"));
        // No handler and no counter row.
        fs.add_irq(200, "0-3", None, None);

        fs.add_task(1, 1, "systemd", "0-3");
        fs.add_task(1234, 1234, "cyclictest", "2-3");
        fs.add_task(1234, 1240, "cyclictest", "3");
        fs.add_file("/proc/1234/status", "Name:\tcyclictest\nPid:\t1234\nCpus_allowed_list:\t2-3\n");

        fs.add_file("/sys/devices/system/cpu/online", "0-3\n");

        fs
    }

    /// Replaces `/proc/interrupts` with the rendering of `stats`.
    pub fn set_interrupts(&mut self, stats: &Stats) {
        self.add_file("/proc/interrupts", render_interrupts(stats));
    }
}

/// Renders a snapshot back into `/proc/interrupts` layout.
///
/// The header lists every CPU of `stats`; labels present on only some CPUs
/// get zero on the others.
pub fn render_interrupts(stats: &Stats) -> String {
    let cpus: Vec<u32> = stats.cpus().collect();
    let mut labels: Vec<&str> = stats
        .iter()
        .flat_map(|(_, counter)| counter.keys().map(String::as_str))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    let mut out = String::from("     ");
    for cpu in &cpus {
        let _ = write!(out, "{:>11}", format!("CPU{}", cpu));
    }
    out.push('\n');

    for label in labels {
        let _ = write!(out, "{:>4}:", label);
        for cpu in &cpus {
            let _ = write!(out, "{:>11}", stats.get(*cpu, label).unwrap_or(0));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::procfs::parser::parse_interrupts;

    #[test]
    fn test_render_interrupts_parses_back() {
        let table = parse_interrupts(TYPICAL_INTERRUPTS).unwrap();
        let rendered = render_interrupts(&table.stats);
        let again = parse_interrupts(&rendered).unwrap();
        assert_eq!(again.stats, table.stats);
    }

    #[test]
    fn test_set_interrupts() {
        use crate::collector::IrqCollector;

        let mut stats = Stats::new();
        stats.set(0, "LOC", 10);
        stats.set(5, "LOC", 20);

        let mut fs = MockFs::typical_system();
        fs.set_interrupts(&stats);
        let read = IrqCollector::new(fs, "/proc").read_stats().unwrap();
        assert_eq!(read, stats);
    }
}
