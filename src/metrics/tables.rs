//! Set-based calculators. Each statement pair upserts by natural key and then
//! deletes keys that no longer occur in the source rows.

pub(crate) const MAX_LIFTS: &str = "
INSERT INTO max_lifts (
    ID, Name, Date, MeetName, Equipment, Event,
    Best3SquatKg, Best3BenchKg, Best3DeadliftKg, TotalKg
)
SELECT
    ID, Name, Date, MeetName, Equipment, Event,
    CASE WHEN Event = 'SBD' THEN Best3SquatKg END,
    Best3BenchKg,
    CASE WHEN Event = 'SBD' THEN Best3DeadliftKg END,
    TotalKg
FROM records
WHERE Event IN ('SBD', 'B')
ON CONFLICT (ID) DO UPDATE SET
    Name = excluded.Name,
    Date = excluded.Date,
    MeetName = excluded.MeetName,
    Equipment = excluded.Equipment,
    Event = excluded.Event,
    Best3SquatKg = excluded.Best3SquatKg,
    Best3BenchKg = excluded.Best3BenchKg,
    Best3DeadliftKg = excluded.Best3DeadliftKg,
    TotalKg = excluded.TotalKg;

DELETE FROM max_lifts WHERE NOT EXISTS (
    SELECT 1 FROM records r
    WHERE r.ID = max_lifts.ID AND r.Event IN ('SBD', 'B')
);
";

// Percentages average only successful (> 0) values; deltas average only
// non-zero magnitudes, so repeated identical weights drop out as well.
pub(crate) const AGGREGATED_SBD: &str = "
INSERT INTO aggregated_metrics_sbd (
    Name, Equipment,
    AvgSuccessfulSquatAttempts, AvgSuccessfulBenchAttempts, AvgSuccessfulDeadliftAttempts,
    AvgTotalSuccessfulAttempts,
    AvgSquat1Perc, AvgSquat2Perc, AvgSquat3Perc,
    AvgBench1Perc, AvgBench2Perc, AvgBench3Perc,
    AvgDeadlift1Perc, AvgDeadlift2Perc, AvgDeadlift3Perc,
    AvgSquat1To2Kg, AvgSquat2To3Kg,
    AvgBench1To2Kg, AvgBench2To3Kg,
    AvgDeadlift1To2Kg, AvgDeadlift2To3Kg
)
SELECT
    lm.Name, lm.Equipment,
    AVG(lm.SuccessfulSquatAttempts), AVG(lm.SuccessfulBenchAttempts),
    AVG(lm.SuccessfulDeadliftAttempts), AVG(lm.TotalSuccessfulAttempts),
    AVG(CASE WHEN lm.Squat1Perc > 0 THEN lm.Squat1Perc END),
    AVG(CASE WHEN lm.Squat2Perc > 0 THEN lm.Squat2Perc END),
    AVG(CASE WHEN lm.Squat3Perc > 0 THEN lm.Squat3Perc END),
    AVG(CASE WHEN lm.Bench1Perc > 0 THEN lm.Bench1Perc END),
    AVG(CASE WHEN lm.Bench2Perc > 0 THEN lm.Bench2Perc END),
    AVG(CASE WHEN lm.Bench3Perc > 0 THEN lm.Bench3Perc END),
    AVG(CASE WHEN lm.Deadlift1Perc > 0 THEN lm.Deadlift1Perc END),
    AVG(CASE WHEN lm.Deadlift2Perc > 0 THEN lm.Deadlift2Perc END),
    AVG(CASE WHEN lm.Deadlift3Perc > 0 THEN lm.Deadlift3Perc END),
    AVG(CASE WHEN ABS(lm.Squat1To2Kg) > 0 THEN ABS(lm.Squat1To2Kg) END),
    AVG(CASE WHEN ABS(lm.Squat2To3Kg) > 0 THEN ABS(lm.Squat2To3Kg) END),
    AVG(CASE WHEN ABS(lm.Bench1To2Kg) > 0 THEN ABS(lm.Bench1To2Kg) END),
    AVG(CASE WHEN ABS(lm.Bench2To3Kg) > 0 THEN ABS(lm.Bench2To3Kg) END),
    AVG(CASE WHEN ABS(lm.Deadlift1To2Kg) > 0 THEN ABS(lm.Deadlift1To2Kg) END),
    AVG(CASE WHEN ABS(lm.Deadlift2To3Kg) > 0 THEN ABS(lm.Deadlift2To3Kg) END)
FROM lifter_metrics lm
JOIN records r ON lm.ID = r.ID AND lm.Date = r.Date AND lm.Equipment = r.Equipment
WHERE r.Event = 'SBD'
GROUP BY lm.Name, lm.Equipment
ON CONFLICT (Name, Equipment) DO UPDATE SET
    AvgSuccessfulSquatAttempts = excluded.AvgSuccessfulSquatAttempts,
    AvgSuccessfulBenchAttempts = excluded.AvgSuccessfulBenchAttempts,
    AvgSuccessfulDeadliftAttempts = excluded.AvgSuccessfulDeadliftAttempts,
    AvgTotalSuccessfulAttempts = excluded.AvgTotalSuccessfulAttempts,
    AvgSquat1Perc = excluded.AvgSquat1Perc,
    AvgSquat2Perc = excluded.AvgSquat2Perc,
    AvgSquat3Perc = excluded.AvgSquat3Perc,
    AvgBench1Perc = excluded.AvgBench1Perc,
    AvgBench2Perc = excluded.AvgBench2Perc,
    AvgBench3Perc = excluded.AvgBench3Perc,
    AvgDeadlift1Perc = excluded.AvgDeadlift1Perc,
    AvgDeadlift2Perc = excluded.AvgDeadlift2Perc,
    AvgDeadlift3Perc = excluded.AvgDeadlift3Perc,
    AvgSquat1To2Kg = excluded.AvgSquat1To2Kg,
    AvgSquat2To3Kg = excluded.AvgSquat2To3Kg,
    AvgBench1To2Kg = excluded.AvgBench1To2Kg,
    AvgBench2To3Kg = excluded.AvgBench2To3Kg,
    AvgDeadlift1To2Kg = excluded.AvgDeadlift1To2Kg,
    AvgDeadlift2To3Kg = excluded.AvgDeadlift2To3Kg;

DELETE FROM aggregated_metrics_sbd WHERE NOT EXISTS (
    SELECT 1 FROM lifter_metrics lm
    JOIN records r ON lm.ID = r.ID AND lm.Date = r.Date AND lm.Equipment = r.Equipment
    WHERE r.Event = 'SBD'
      AND lm.Name IS aggregated_metrics_sbd.Name
      AND lm.Equipment IS aggregated_metrics_sbd.Equipment
);
";

pub(crate) const AGGREGATED_BENCH: &str = "
INSERT INTO aggregated_metrics_bench (
    Name, Equipment,
    AvgSuccessfulBenchAttempts,
    AvgBench1Perc, AvgBench2Perc, AvgBench3Perc,
    AvgBench1To2Kg, AvgBench2To3Kg
)
SELECT
    lm.Name, lm.Equipment,
    AVG(lm.SuccessfulBenchAttempts),
    AVG(CASE WHEN lm.Bench1Perc > 0 THEN lm.Bench1Perc END),
    AVG(CASE WHEN lm.Bench2Perc > 0 THEN lm.Bench2Perc END),
    AVG(CASE WHEN lm.Bench3Perc > 0 THEN lm.Bench3Perc END),
    AVG(CASE WHEN ABS(lm.Bench1To2Kg) > 0 THEN ABS(lm.Bench1To2Kg) END),
    AVG(CASE WHEN ABS(lm.Bench2To3Kg) > 0 THEN ABS(lm.Bench2To3Kg) END)
FROM lifter_metrics lm
JOIN records r ON lm.ID = r.ID AND lm.Date = r.Date AND lm.Equipment = r.Equipment
WHERE r.Event = 'B'
GROUP BY lm.Name, lm.Equipment
ON CONFLICT (Name, Equipment) DO UPDATE SET
    AvgSuccessfulBenchAttempts = excluded.AvgSuccessfulBenchAttempts,
    AvgBench1Perc = excluded.AvgBench1Perc,
    AvgBench2Perc = excluded.AvgBench2Perc,
    AvgBench3Perc = excluded.AvgBench3Perc,
    AvgBench1To2Kg = excluded.AvgBench1To2Kg,
    AvgBench2To3Kg = excluded.AvgBench2To3Kg;

DELETE FROM aggregated_metrics_bench WHERE NOT EXISTS (
    SELECT 1 FROM lifter_metrics lm
    JOIN records r ON lm.ID = r.ID AND lm.Date = r.Date AND lm.Equipment = r.Equipment
    WHERE r.Event = 'B'
      AND lm.Name IS aggregated_metrics_bench.Name
      AND lm.Equipment IS aggregated_metrics_bench.Equipment
);
";

pub(crate) const WEIGHT_CLASS_DISTRIBUTION: &str = "
INSERT INTO weight_class_distribution (WeightClass, Sex, Count)
SELECT WeightClassKg, Sex, COUNT(DISTINCT Name)
FROM records
WHERE WeightClassKg IS NOT NULL AND Sex IS NOT NULL
GROUP BY WeightClassKg, Sex
ON CONFLICT (WeightClass, Sex) DO UPDATE SET Count = excluded.Count;

DELETE FROM weight_class_distribution WHERE NOT EXISTS (
    SELECT 1 FROM records r
    WHERE r.WeightClassKg IS weight_class_distribution.WeightClass
      AND r.Sex IS weight_class_distribution.Sex
);
";

pub(crate) const AGE_GROUP_PERFORMANCE: &str = "
INSERT INTO age_group_performance (AgeClass, Sex, AvgSquat, AvgBench, AvgDeadlift, AvgTotal)
SELECT AgeClass, Sex, AVG(Best3SquatKg), AVG(Best3BenchKg), AVG(Best3DeadliftKg), AVG(TotalKg)
FROM records
WHERE AgeClass != '' AND Sex IS NOT NULL
GROUP BY AgeClass, Sex
ON CONFLICT (AgeClass, Sex) DO UPDATE SET
    AvgSquat = excluded.AvgSquat,
    AvgBench = excluded.AvgBench,
    AvgDeadlift = excluded.AvgDeadlift,
    AvgTotal = excluded.AvgTotal;

DELETE FROM age_group_performance WHERE NOT EXISTS (
    SELECT 1 FROM records r
    WHERE r.AgeClass != ''
      AND r.AgeClass IS age_group_performance.AgeClass
      AND r.Sex IS age_group_performance.Sex
);
";

// Dates that strftime cannot read have no year and are left out.
pub(crate) const PERFORMANCE_TRENDS: &str = "
INSERT INTO performance_trends (Year, Sex, AvgSquat, AvgBench, AvgDeadlift, AvgTotal)
SELECT strftime('%Y', Date) AS Year, Sex,
    AVG(Best3SquatKg), AVG(Best3BenchKg), AVG(Best3DeadliftKg), AVG(TotalKg)
FROM records
WHERE strftime('%Y', Date) IS NOT NULL AND Sex IS NOT NULL
GROUP BY Year, Sex
ORDER BY Year
ON CONFLICT (Year, Sex) DO UPDATE SET
    AvgSquat = excluded.AvgSquat,
    AvgBench = excluded.AvgBench,
    AvgDeadlift = excluded.AvgDeadlift,
    AvgTotal = excluded.AvgTotal;

DELETE FROM performance_trends WHERE NOT EXISTS (
    SELECT 1 FROM records r
    WHERE strftime('%Y', r.Date) IS performance_trends.Year
      AND r.Sex IS performance_trends.Sex
);
";
