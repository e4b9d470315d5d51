use bbdprec::parallel::{HaloExchange, SerialComm};
use bbdprec::{CallbackError, IntegratorContext, LocalModel, MatVec, PartitionConfig};

/// Method-of-lines heat equation on one partition: G_i = y'_i - k (y_{i-1} - 2 y_i + y_{i+1}).
struct Heat {
    k: f64,
    comm: SerialComm,
    halo: HaloExchange,
}

impl LocalModel for Heat {
    fn evaluate_local(
        &mut self,
        _t: f64,
        y: &[f64],
        yp: &[f64],
        g: &mut [f64],
    ) -> Result<(), CallbackError> {
        let n = y.len();
        let below = self.halo.lower().map_or(0.0, |l| l[0]);
        let above = self.halo.upper().map_or(0.0, |u| u[0]);
        for i in 0..n {
            let left = if i > 0 { y[i - 1] } else { below };
            let right = if i + 1 < n { y[i + 1] } else { above };
            g[i] = yp[i] - self.k * (left - 2.0 * y[i] + right);
        }
        Ok(())
    }

    fn exchange_halo(&mut self, _t: f64, y: &[f64], _yp: &[f64]) -> Result<(), CallbackError> {
        self.halo.exchange(&self.comm, y);
        Ok(())
    }
}

fn main() {
    let n = 20;
    let k = 100.0;
    let mut ida = IntegratorContext::new(n);
    ida.attach_krylov(5).unwrap();
    ida.set_step(0.0, 1e-3, 1.0 / 1e-3).unwrap();

    let cfg = PartitionConfig::new(n).eval_bandwidths(1, 1).keep_bandwidths(1, 1);
    ida.bbd_prec_init(cfg, Heat { k, comm: SerialComm, halo: HaloExchange::new(1) })
        .unwrap();

    let y: Vec<f64> = (0..n).map(|i| (std::f64::consts::PI * i as f64 / n as f64).sin()).collect();
    let yp = vec![0.0; n];
    ida.prec_setup(&y, &yp, false).unwrap();

    let r = vec![1.0; n];
    let mut z = vec![0.0; n];
    ida.prec_solve(&r, &mut z).unwrap();

    // P is tridiagonal: cj + 2k on the diagonal, -k off it.
    let ls = ida.linear_solver().unwrap();
    let pc = ls.bbd().unwrap();
    let (lu, _) = pc.factors().unwrap();
    let mut p = bbdprec::BandMatrix::try_new(n, 1, 1, lu.storage_upper()).unwrap();
    for i in 0..n {
        p.set(i, i, 1e3 + 2.0 * k);
        if i > 0 {
            p.set(i, i - 1, -k);
            p.set(i - 1, i, -k);
        }
    }
    let mut pz = vec![0.0; n];
    p.matvec(&z[..], &mut pz[..]);
    let err = pz.iter().zip(&r).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);

    let (lrw, liw) = ida.bbd_work_space().unwrap();
    println!("z = {:?}", z);
    println!("max |P z - r| = {:e}", err);
    println!("work space: {} real, {} integer words", lrw, liw);
    println!("stats = {:?}", ida.bbd_stats().unwrap());
}
