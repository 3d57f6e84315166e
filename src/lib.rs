pub mod core;
pub mod compression;
pub mod lexicon;
pub mod postings;
pub mod index;
pub mod indexer;
pub mod parallel;
pub mod query;
pub mod batch;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                          MARTEN ARCHITECTURE                             │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── BUILD PATH ──────────────────────────────┐
│                                                                          │
│  Document stream ──> SinglePassIndexer ──spill──> Run files              │
│       │                    │ (BTreeMap accumulator, byte budget)         │
│       │                    └──finish──> merge_runs ──> staging ──rename──┤
│       │                                                                  │
│  ThreadedIndexer ──> N private sub-indices ──> reduction-tree merges     │
│  map_shard / reduce_partition / post_merge ──> reducer-numbered files    │
│                                                                          │
│  On-disk structures ({prefix}.{structure}):                              │
│    .lex      fixed 80-byte rows, binary search + iteration               │
│    .if.N     bit-packed posting lists, skip tables, (byte,bit) pointers  │
│    .docix    LZ4 blocks of (docno, length) rows, crc32 checked           │
│    .meta.json descriptor: codecs, flags, statistics; written last        │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── QUERY PATH ──────────────────────────────┐
│                                                                          │
│  Topic ──parse──> MatchingQueryTerms ──> QueryEngine (DAAT)              │
│                        │                     │ one cursor per term       │
│                        │                     v                           │
│                   ResultCache <──store── ResultSet (ids|scores|u16 mask) │
│                        │                     │                           │
│                        │          ScoreModifier chain (dependence,       │
│                        │          boolean fallback, static prior)        │
│                        │                     │                           │
│                        └──hit──> ResultWriter (serialized shared sink)   │
└──────────────────────────────────────────────────────────────────────────┘
*/
