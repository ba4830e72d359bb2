//! Black-box behaviour every host can rely on.

use adsp_core::dsp::{db_to_raw_gain, freq_to_pitch, pitch_to_freq, raw_gain_to_db, saturate};
use adsp_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SR: f64 = 48_000.0;

fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * b.abs().max(1.0)
}

#[test]
fn biquad_realizations_are_equivalent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20 {
        let cut = rng.gen_range(200.0..8000.0);
        let sets = [
            RcLp1::new(cut, SR).coefficients(),
            RcHp1::new(cut, SR).coefficients(),
            ApLp1::new(cut, SR).coefficients(),
            SkHp2::new(cut, SR).coefficients(),
            SkLp2::new(cut, SR).coefficients(),
            Coefficients { a0: 0.3, a1: -0.2, a2: 0.1, b1: -1.2, b2: 0.5 },
        ];
        let input: Vec<f64> = (0..2048).map(|_| rng.gen_range(-1.0..1.0)).collect();

        for c in sets {
            let mut bank = Realization::ALL.map(|r| Biquad::with_coefficients(r, c));
            for &x in &input {
                let [d, rest @ ..] = bank.each_mut().map(|bq| bq.process(x));
                for y in rest {
                    assert!(close(y, d, 1e-9), "{c:?}: {y} vs {d}");
                }
            }
        }
    }
}

#[test]
fn cutoff_modulation_on_the_filter_bank_is_click_free() {
    let mut lp = RcLp1::new(1000.0, SR);
    assert_eq!(lp.biquad_mut().realization(), Realization::TransposedCanonical);

    let mut prev = 0.0;
    for n in 0..48_000 {
        if n % 64 == 0 {
            lp.set_cutoff_hz(if (n / 64) % 2 == 0 { 2000.0 } else { 1000.0 });
        }
        let x = (std::f64::consts::TAU * 100.0 * n as f64 / SR).sin();
        let y = lp.process(x);
        if n > 0 {
            assert!((y - prev).abs() < 0.15, "jump at {n}: {prev} -> {y}");
        }
        prev = y;
    }
}

/// Largest sample-to-sample step of a 100 Hz sine through `r` while the
/// cutoff toggles between 1 and 2 kHz every 64 samples.
fn max_step_under_modulation(r: Realization) -> f64 {
    let slow = RcLp1::new(1000.0, SR).coefficients();
    let fast = RcLp1::new(2000.0, SR).coefficients();
    let mut bq = Biquad::with_coefficients(r, slow);
    let (mut prev, mut worst) = (0.0, 0.0_f64);
    for n in 0..48_000 {
        if n % 64 == 0 {
            bq.set_coefficients(if (n / 64) % 2 == 0 { fast } else { slow });
        }
        let y = bq.process((std::f64::consts::TAU * 100.0 * n as f64 / SR).sin());
        if n > 0 {
            worst = worst.max((y - prev).abs());
        }
        prev = y;
    }
    worst
}

#[test]
fn only_transposed_canonical_is_click_free_under_modulation() {
    assert!(Realization::TransposedDirect.is_transposed());
    let canonical = max_step_under_modulation(Realization::TransposedCanonical);
    let direct = max_step_under_modulation(Realization::TransposedDirect);
    assert!(canonical < 0.1, "{canonical}");
    assert!(direct > 0.3, "{direct}");
}

#[test]
fn zero_resonance_networks_reduce_to_cascades() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut lp = LadderLp4::new(1500.0, 0.0, SR);
    let mut hp = LadderHp4::new(150.0, 0.0, SR);
    let mut sk = SkHp2Tpt::new(150.0, 0.0, SR);
    let mut lp_chain = [TptLp1::new(1500.0, SR); 4];
    let mut hp_chain = [TptHp1::new(150.0, SR); 4];
    let mut sk_chain = [TptHp1::new(150.0, SR); 2];

    for _ in 0..4096 {
        let x: f64 = rng.gen_range(-2.0..2.0);
        let want_lp = lp_chain.iter_mut().fold(x, |u, st| st.process(u));
        let want_hp = hp_chain.iter_mut().fold(x, |u, st| st.process(u));
        let want_sk = sk_chain.iter_mut().fold(saturate(x), |u, st| st.process(u));
        assert!((lp.process(x) - want_lp).abs() < 1e-12);
        assert!((hp.process(x) - want_hp).abs() < 1e-12);
        assert!((sk.process(x) - want_sk).abs() < 1e-12);
    }
}

#[test]
fn conversions_round_trip() {
    let mut f = 20.0;
    while f < 20_000.0 {
        assert!(close(pitch_to_freq(freq_to_pitch(f)), f, 1e-6), "{f}");
        f *= 1.1;
    }
    let mut g: f64 = 1e-4;
    while g < 100.0 {
        assert!(((db_to_raw_gain(raw_gain_to_db(g)) - g) / g).abs() < 1e-6, "{g}");
        g *= 1.3;
    }
}

fn pluck() -> Adsr {
    let mut env = Adsr::new(AdsrParams { attack: 0.1, decay: 0.1, sustain: 0.5, release: 0.2 }, SR);
    env.reset(SR);
    env
}

#[test]
fn adsr_settles_on_sustain_within_attack_plus_decay() {
    let mut env = pluck();
    env.set_gate(true);
    let mut y = 0.0;
    for _ in 0..((0.1 + 0.1) * SR) as usize {
        y = env.render();
    }
    assert!((y - 0.5 * PEAK_ENV_VOLTAGE).abs() < 0.01, "{y}");
    for _ in 0..48_000 {
        assert!((env.render() - 4.0).abs() < 1e-5);
    }
}

#[test]
fn adsr_release_mid_attack_has_no_discontinuity() {
    let mut env = pluck();
    env.set_gate(true);
    let mut y = 0.0;
    while y < 3.0 {
        y = env.render();
    }
    env.set_gate(false);
    for _ in 0..2000 {
        let next = env.render();
        assert!((next - y).abs() < 0.01, "{y} -> {next}");
        y = next;
    }
    assert_eq!(env.stage(), AdsrStage::Release);
}

#[test]
fn eptr_outputs_stay_bounded() {
    let mut osc = OscEptr::new(OscillatorParams { frequency: 1000.0, ..Default::default() }, SR);
    osc.reset(SR);
    for n in 0..10_000 {
        let o = osc.render_outputs();
        assert!(
            o.saw.abs() <= 1.05 && o.tri.abs() <= 1.05 && o.pulse.abs() <= 1.05,
            "sample {n}: {o:?}"
        );
    }
}

#[test]
fn naive_retrigger_is_deterministic() {
    let mut osc = OscTrivial::new(OscillatorParams { frequency: 3_333.0, ..Default::default() }, SR);
    osc.reset(SR);
    for _ in 0..1000 {
        osc.render_outputs();
    }
    osc.retrigger();
    let o = osc.render_outputs();
    assert_eq!(o.saw, -1.0);
    assert_eq!(o.pulse, 1.0);
}
